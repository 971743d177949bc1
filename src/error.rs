use std::path::PathBuf;

/// Errors raised by a [`SpeechSynthesizer`](crate::SpeechSynthesizer) backend.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Synthesis failed: {0}")]
    Failed(String),
}

/// Errors raised by an [`AudioEditor`](crate::audio::AudioEditor) backend.
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported audio in {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("Silence of {0} ms exceeds the supported maximum")]
    SilenceTooLong(u64),
}

/// Everything that can go wrong while turning a translation list into audio.
///
/// The first four variants are per-operation failures the pipeline recovers
/// from; the rest are configuration problems reported before a run starts.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid translation format for entry {index}: {line:?}, skipping")]
    MalformedEntry { index: usize, line: String },
    #[error("Failed to synthesize {text:?} ({language}): {source}")]
    Synthesis {
        text: String,
        language: String,
        source: SynthesisError,
    },
    #[error("Failed to build {}: {source}", output.display())]
    Concatenation { output: PathBuf, source: AudioError },
    #[error("Failed to remove {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid language pair {value:?}, expected <source>{delimiter}<target>")]
    InvalidLanguagePair { value: String, delimiter: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to load config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}
