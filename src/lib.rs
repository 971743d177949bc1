//! # vocab-audio
//!
//! Turn a list of word/translation pairs into narrated audio flashcards.
//!
//! For every `word:translation` line the pipeline speaks the word in the
//! source language, then the translation in the target language, and keeps
//! the pair as one clip in a temporary directory. All clips are then joined,
//! in input order and separated by a configurable pause, into one combined
//! audio file.
//!
//! ## Features
//!
//! - **Pluggable synthesis**: anything implementing [`SpeechSynthesizer`];
//!   an `espeak-ng` backend ships in [`engines::espeak`]
//! - **In-process editing**: [`audio::WavEditor`] loads, joins and exports WAV
//! - **Clip cache**: pairs already built by an earlier run are reused
//!
//! ## Quick Start
//!
//! ```ignore
//! use vocab_audio::{
//!     audio::WavEditor, config::PipelineConfig, engines::espeak::EspeakSynthesizer,
//!     pipeline::Pipeline,
//! };
//!
//! let mut pipeline = Pipeline::new(
//!     PipelineConfig::default(),
//!     EspeakSynthesizer::new(),
//!     WavEditor::new(),
//! )?;
//! let report = pipeline.run(["cat:кот", "dog:собака"]);
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod config;
pub mod engines;
pub mod entry;
pub mod error;
pub mod pipeline;
pub mod storage;

use std::path::Path;

use error::SynthesisError;

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw mono audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), SynthesisError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech backends.
///
/// The pipeline only ever asks for one word or short phrase at a time, in
/// the language given by its code (e.g. `"en"`, `"ru"`).
pub trait SpeechSynthesizer {
    /// Synthesize speech for `text` in `language`.
    fn synthesize(&mut self, text: &str, language: &str)
        -> Result<SynthesisResult, SynthesisError>;

    /// Synthesize speech and write it to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        language: &str,
        wav_path: &Path,
    ) -> Result<(), SynthesisError> {
        self.synthesize(text, language)?.write_wav(wav_path)
    }
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Box<T> {
    fn synthesize(
        &mut self,
        text: &str,
        language: &str,
    ) -> Result<SynthesisResult, SynthesisError> {
        (**self).synthesize(text, language)
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        language: &str,
        wav_path: &Path,
    ) -> Result<(), SynthesisError> {
        (**self).synthesize_to_file(text, language, wav_path)
    }
}
