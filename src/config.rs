//! Pipeline configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::audio::MAX_SILENCE_MS;
use crate::entry::LanguagePair;
use crate::error::PipelineError;

/// Everything a [`Pipeline`](crate::pipeline::Pipeline) needs to know about a
/// run. Every path is explicit; nothing depends on the working directory
/// beyond how relative paths resolve.
///
/// ```rust
/// use vocab_audio::config::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .languages("en:de")
///     .delay_secs(2u64)
///     .build()
///     .unwrap();
/// assert_eq!(config.delimiter, ":");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct PipelineConfig {
    /// Separator between the two words of an entry and between the two
    /// language codes.
    pub delimiter: String,
    /// Language pair such as `en:ru`.
    pub languages: String,
    /// Silence inserted between consecutive pairs, in seconds.
    pub delay_secs: u64,
    /// Scratch directory holding per-pair clips.
    pub tmp_dir: PathBuf,
    /// Combined output file.
    pub output_path: PathBuf,
    /// Delete clips left over from earlier runs before starting.
    pub purge_stale_clips: bool,
    /// Remove the scratch directory once the run is finished.
    pub cleanup: bool,
}

/// Longest pause accepted between pairs.
pub const MAX_DELAY_SECS: u64 = MAX_SILENCE_MS / 1000;

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delimiter: ":".to_string(),
            languages: "en:ru".to_string(),
            delay_secs: 1,
            tmp_dir: PathBuf::from("tmp"),
            output_path: PathBuf::from("combined_output.wav"),
            purge_stale_clips: false,
            cleanup: false,
        }
    }
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.delimiter {
            Some(delimiter) if delimiter.is_empty() => Err("delimiter must not be empty".into()),
            _ => Ok(()),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration and return the parsed language pair.
    pub fn validate(&self) -> Result<LanguagePair, PipelineError> {
        if self.delimiter.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "delimiter must not be empty".to_string(),
            ));
        }
        if self.delay_secs > MAX_DELAY_SECS {
            return Err(PipelineError::InvalidConfig(format!(
                "delay of {}s exceeds the maximum of {MAX_DELAY_SECS}s",
                self.delay_secs
            )));
        }
        self.language_pair()
    }

    pub fn language_pair(&self) -> Result<LanguagePair, PipelineError> {
        LanguagePair::parse(&self.languages, &self.delimiter)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_secs.saturating_mul(1000)
    }
}
