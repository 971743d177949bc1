//! `espeak-ng` speech synthesizer.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! Text is always fed over stdin so words starting with `-` are never taken
//! for command line flags.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::SynthesisError;
use crate::{SpeechSynthesizer, SynthesisResult};

/// Map a language code to an espeak-ng voice name.
///
/// Most two-letter codes are accepted by espeak-ng as-is; a few common
/// codes use a different name there.
pub fn espeak_voice(language: &str) -> Cow<'_, str> {
    match language.to_ascii_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-tw" | "zh-hans" | "zh-hant" => Cow::Borrowed("cmn"),
        "iw" => Cow::Borrowed("he"),
        "nb" | "no" => Cow::Borrowed("nb"),
        _ => Cow::Borrowed(language),
    }
}

/// Speech synthesizer backed by the `espeak-ng` command line tool.
///
/// ```rust,no_run
/// use std::path::Path;
/// use vocab_audio::{engines::espeak::EspeakSynthesizer, SpeechSynthesizer};
///
/// let mut tts = EspeakSynthesizer::new();
/// tts.synthesize_to_file("cat", "en", Path::new("cat.wav"))?;
/// # Ok::<(), vocab_audio::error::SynthesisError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EspeakSynthesizer {
    bin_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
}

impl EspeakSynthesizer {
    /// Use `espeak-ng` from PATH with its default data directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit binary and/or data directory. `None` falls back to
    /// the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            bin_path,
            data_path,
        }
    }

    fn command(&self, language: &str) -> Command {
        let mut cmd = Command::new(
            self.bin_path
                .as_deref()
                .unwrap_or_else(|| Path::new("espeak-ng")),
        );
        if let Some(data) = &self.data_path {
            cmd.arg(format!("--path={}", data.display()));
        }
        cmd.args(["--stdin", "-v", espeak_voice(language).as_ref()]);
        cmd
    }

    /// Run espeak-ng with `extra_args`, writing `text` to its stdin.
    /// Returns whatever it printed on stdout.
    fn run(
        &self,
        text: &str,
        language: &str,
        extra_args: &[&OsStr],
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut child = self
            .command(language)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SynthesisError::EspeakNotFound
                } else {
                    SynthesisError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // espeak-ng reads stdin line by line; an unterminated last line
            // can lose its final phoneme.
            stdin.write_all(stdin_payload(text).as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthesisError::Failed(format!(
                "espeak-ng exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }

        Ok(output.stdout)
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
    ) -> Result<SynthesisResult, SynthesisError> {
        let wav = self.run(text, language, &[OsStr::new("--stdout")])?;
        decode_stream(&wav)
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        language: &str,
        wav_path: &Path,
    ) -> Result<(), SynthesisError> {
        log::debug!("espeak-ng [{language}] {text:?} -> {}", wav_path.display());
        self.run(text, language, &[OsStr::new("-w"), wav_path.as_os_str()])?;
        Ok(())
    }
}

fn stdin_payload(text: &str) -> Cow<'_, str> {
    if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{text}\n"))
    }
}

/// Decode the WAV espeak-ng writes to stdout.
///
/// espeak-ng cannot seek back on a pipe to patch the header, so the declared
/// data length is a placeholder: read samples until the stream runs dry.
fn decode_stream(wav: &[u8]) -> Result<SynthesisResult, SynthesisError> {
    let reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map_while(Result::ok)
            .collect(),
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map_while(Result::ok)
                .map(|s| s as f32 / max_value)
                .collect()
        }
    };

    let samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok(SynthesisResult {
        samples,
        sample_rate: spec.sample_rate,
    })
}
