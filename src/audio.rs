//! Audio editing: loading, silence, appending and exporting clips.
//!
//! Every clip produced by the pipeline is a mono WAV file. [`WavEditor`] does
//! all of its work in-process with `hound`; other backends (for instance one
//! that shells out to ffmpeg) only need to implement [`AudioEditor`].

use std::fs;
use std::path::Path;

use crate::error::AudioError;

/// File extension of every clip the pipeline writes.
pub const CLIP_EXTENSION: &str = "wav";

/// Sample rate of `espeak-ng` output, used for generated silence by default.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Longest silence an editor is asked to generate (one hour).
pub const MAX_SILENCE_MS: u64 = 3_600_000;

/// Sample encoding used when exporting a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// 32-bit float WAV.
    #[default]
    WavFloat32,
    /// 16-bit PCM WAV.
    WavPcm16,
}

/// Mono audio held in memory.
///
/// A `sample_rate` of 0 marks a clip that has no format yet, such as the
/// empty accumulator a concatenation starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Zero-duration clip with no sample rate.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Logical audio operations the pipeline needs.
pub trait AudioEditor {
    /// Load a clip from disk, downmixed to mono.
    fn load(&self, path: &Path) -> Result<AudioClip, AudioError>;

    /// Silence of the given length, at most [`MAX_SILENCE_MS`].
    fn silence(&self, duration_ms: u64) -> Result<AudioClip, AudioError>;

    /// Append `next` to the end of `base`.
    fn append(&self, base: AudioClip, next: &AudioClip) -> Result<AudioClip, AudioError>;

    /// Write a clip to `path`, creating parent directories as needed.
    fn export(&self, clip: &AudioClip, path: &Path, format: AudioFormat) -> Result<(), AudioError>;

    /// Join two files, `first` then `second`, into `output`.
    ///
    /// Default implementation is `load` + `append` + `export`.
    fn concatenate(
        &self,
        first: &Path,
        second: &Path,
        output: &Path,
        format: AudioFormat,
    ) -> Result<(), AudioError> {
        let first = self.load(first)?;
        let second = self.load(second)?;
        let joined = self.append(first, &second)?;
        self.export(&joined, output, format)
    }
}

/// In-process WAV editor.
#[derive(Debug, Clone)]
pub struct WavEditor {
    sample_rate: u32,
}

impl Default for WavEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl WavEditor {
    /// Editor generating silence at [`DEFAULT_SAMPLE_RATE`].
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Editor generating silence at `sample_rate`.
    ///
    /// Pick the synthesizer's native rate to avoid resampling the gaps.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioEditor for WavEditor {
    fn load(&self, path: &Path) -> Result<AudioClip, AudioError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(AudioError::Unsupported {
                path: path.to_path_buf(),
                reason: "zero channels".to_string(),
            });
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_value))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples = if spec.channels > 1 {
            samples
                .chunks(spec.channels as usize)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        } else {
            samples
        };

        log::debug!(
            "Loaded {} ({} samples @ {}Hz)",
            path.display(),
            samples.len(),
            spec.sample_rate
        );

        Ok(AudioClip {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    fn silence(&self, duration_ms: u64) -> Result<AudioClip, AudioError> {
        let len = (duration_ms <= MAX_SILENCE_MS)
            .then(|| (self.sample_rate as u64).checked_mul(duration_ms))
            .flatten()
            .and_then(|n| usize::try_from(n / 1000).ok())
            .ok_or(AudioError::SilenceTooLong(duration_ms))?;
        Ok(AudioClip {
            samples: vec![0.0; len],
            sample_rate: self.sample_rate,
        })
    }

    fn append(&self, mut base: AudioClip, next: &AudioClip) -> Result<AudioClip, AudioError> {
        if base.sample_rate == 0 {
            return Ok(next.clone());
        }
        if next.sample_rate == 0 || next.sample_rate == base.sample_rate {
            base.samples.extend_from_slice(&next.samples);
        } else {
            base.samples.extend(resample_linear(
                &next.samples,
                next.sample_rate,
                base.sample_rate,
            ));
        }
        Ok(base)
    }

    fn export(&self, clip: &AudioClip, path: &Path, format: AudioFormat) -> Result<(), AudioError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let sample_rate = if clip.sample_rate == 0 {
            self.sample_rate
        } else {
            clip.sample_rate
        };

        match format {
            AudioFormat::WavFloat32 => {
                let spec = hound::WavSpec {
                    channels: 1,
                    sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let mut writer = hound::WavWriter::create(path, spec)?;
                for &sample in &clip.samples {
                    writer.write_sample(sample)?;
                }
                writer.finalize()?;
            }
            AudioFormat::WavPcm16 => {
                let spec = hound::WavSpec {
                    channels: 1,
                    sample_rate,
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                let mut writer = hound::WavWriter::create(path, spec)?;
                for &sample in &clip.samples {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    writer.write_sample(scaled)?;
                }
                writer.finalize()?;
            }
        }

        log::debug!(
            "Exported {} ({} ms)",
            path.display(),
            clip.duration_ms()
        );
        Ok(())
    }
}

/// Linear-interpolation resampler. Good enough for speech joined with silence.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let left = samples[idx];
            let right = samples[(idx + 1).min(last)];
            left + (right - left) * frac
        })
        .collect()
}
