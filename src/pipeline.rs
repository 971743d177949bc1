//! The translation pipeline: parse entries, build (or reuse) one clip per
//! entry, then join every clip into the combined output.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{AudioClip, AudioEditor, AudioFormat};
use crate::config::PipelineConfig;
use crate::entry::{parse_entries, LanguagePair, TranslationEntry};
use crate::error::PipelineError;
use crate::storage::TempStorage;
use crate::SpeechSynthesizer;

/// Ordered clip paths for one run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipManifest {
    clips: Vec<PathBuf>,
}

impl ClipManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.clips.push(path);
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.clips
    }
}

impl IntoIterator for ClipManifest {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.clips.into_iter()
    }
}

/// What [`Pipeline::build_clip`] did for an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    /// Both words were synthesized and joined.
    Built(PathBuf),
    /// A clip from an earlier run was found and kept.
    Reused(PathBuf),
}

impl ClipOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ClipOutcome::Built(path) | ClipOutcome::Reused(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            ClipOutcome::Built(path) | ClipOutcome::Reused(path) => path,
        }
    }
}

/// Summary of a full run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Input lines seen, valid or not.
    pub lines: usize,
    pub built: usize,
    pub reused: usize,
    /// Every recovered failure, in the order it happened.
    pub failures: Vec<PipelineError>,
    /// Combined output, when the final concatenation succeeded.
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.output.is_some()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} clips built, {} reused, {} failures",
            self.lines,
            self.built,
            self.reused,
            self.failures.len()
        )?;
        match &self.output {
            Some(path) => write!(f, ", output written to {}", path.display()),
            None => write!(f, ", no output written"),
        }
    }
}

/// Drives a [`SpeechSynthesizer`] and an [`AudioEditor`] over a list of
/// translation lines.
///
/// ```rust,no_run
/// use vocab_audio::{
///     audio::WavEditor, config::PipelineConfig, engines::espeak::EspeakSynthesizer,
///     pipeline::Pipeline,
/// };
///
/// let mut pipeline = Pipeline::new(
///     PipelineConfig::default(),
///     EspeakSynthesizer::new(),
///     WavEditor::new(),
/// )?;
/// let report = pipeline.run(["cat:кот", "dog:собака"]);
/// println!("{report}");
/// # Ok::<(), vocab_audio::error::PipelineError>(())
/// ```
pub struct Pipeline<S, E> {
    config: PipelineConfig,
    languages: LanguagePair,
    storage: TempStorage,
    synthesizer: S,
    editor: E,
}

impl<S: SpeechSynthesizer, E: AudioEditor> Pipeline<S, E> {
    /// Validate the configuration and create the temporary directory.
    pub fn new(config: PipelineConfig, synthesizer: S, editor: E) -> Result<Self, PipelineError> {
        let languages = config.validate()?;
        let storage = TempStorage::new(config.tmp_dir.clone());
        storage.ensure()?;

        Ok(Self {
            config,
            languages,
            storage,
            synthesizer,
            editor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn languages(&self) -> &LanguagePair {
        &self.languages
    }

    pub fn storage(&self) -> &TempStorage {
        &self.storage
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Produce the clip for one entry, or reuse the one already on disk.
    ///
    /// On failure the transient recordings and any partial clip are removed,
    /// so a broken clip is never picked up by the cache later.
    pub fn build_clip(&mut self, entry: &TranslationEntry) -> Result<ClipOutcome, PipelineError> {
        let clip_path = self.storage.clip_path(&entry.source);
        if clip_path.exists() {
            log::info!(
                "Skip {:?}: {} already exists",
                entry.source,
                clip_path.display()
            );
            return Ok(ClipOutcome::Reused(clip_path));
        }

        let (first, second) = self.storage.transient_paths();
        let result = self.render_pair(entry, &first, &second, &clip_path);
        remove_quietly(&first);
        remove_quietly(&second);

        match result {
            Ok(()) => {
                log::info!(
                    "Built {} ({:?} -> {:?})",
                    clip_path.display(),
                    entry.source,
                    entry.target
                );
                Ok(ClipOutcome::Built(clip_path))
            }
            Err(err) => {
                remove_quietly(&clip_path);
                Err(err)
            }
        }
    }

    fn render_pair(
        &mut self,
        entry: &TranslationEntry,
        first: &Path,
        second: &Path,
        clip_path: &Path,
    ) -> Result<(), PipelineError> {
        for (text, language, path) in [
            (&entry.source, &self.languages.source, first),
            (&entry.target, &self.languages.target, second),
        ] {
            self.synthesizer
                .synthesize_to_file(text, language, path)
                .map_err(|source| PipelineError::Synthesis {
                    text: text.clone(),
                    language: language.clone(),
                    source,
                })?;
        }

        self.editor
            .concatenate(first, second, clip_path, AudioFormat::default())
            .map_err(|source| PipelineError::Concatenation {
                output: clip_path.to_path_buf(),
                source,
            })
    }

    /// Parse `lines` and build a clip for every valid entry.
    ///
    /// Malformed lines and failed entries are logged, recorded in `report`,
    /// and left out of the manifest.
    pub fn build_manifest<I, L>(&mut self, lines: I, report: &mut RunReport) -> ClipManifest
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let lines: Vec<L> = lines.into_iter().collect();
        report.lines += lines.len();

        let parsed = parse_entries(&lines, &self.config.delimiter);
        report.failures.extend(parsed.rejected);

        let mut manifest = ClipManifest::new();
        for entry in &parsed.entries {
            match self.build_clip(entry) {
                Ok(outcome) => {
                    match outcome {
                        ClipOutcome::Built(_) => report.built += 1,
                        ClipOutcome::Reused(_) => report.reused += 1,
                    }
                    manifest.push(outcome.into_path());
                }
                Err(err) => {
                    log::warn!("Entry {}: {err}", entry.index);
                    report.failures.push(err);
                }
            }
        }
        manifest
    }

    /// Join every clip in `manifest` into the configured output file,
    /// with the configured delay between consecutive clips.
    pub fn concatenate(&self, manifest: ClipManifest) -> Result<PathBuf, PipelineError> {
        let output = self.config.output_path.clone();
        let wrap = |source| PipelineError::Concatenation {
            output: output.clone(),
            source,
        };

        let gap = self.editor.silence(self.config.delay_ms()).map_err(wrap)?;
        let last = manifest.len().saturating_sub(1);
        let mut combined = AudioClip::empty();

        for (i, path) in manifest.into_iter().enumerate() {
            let clip = self.editor.load(&path).map_err(wrap)?;
            combined = self.editor.append(combined, &clip).map_err(wrap)?;
            if i < last {
                combined = self.editor.append(combined, &gap).map_err(wrap)?;
            }
        }

        self.editor
            .export(&combined, &output, AudioFormat::default())
            .map_err(wrap)?;
        log::info!(
            "Combined audio written to {} ({} ms)",
            output.display(),
            combined.duration_ms()
        );
        Ok(output)
    }

    /// Remove the temporary directory and everything in it.
    pub fn cleanup(&self) -> Result<(), PipelineError> {
        self.storage.remove()?;
        log::info!("Removed {}", self.storage.path().display());
        Ok(())
    }

    /// Full pass: build clips for `lines`, join them, then clean up if
    /// configured. Never stops early; every failure ends up in the report.
    pub fn run<I, L>(&mut self, lines: I) -> RunReport
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut report = RunReport::default();

        if let Err(err) = self.storage.ensure() {
            log::error!("{err}");
            report.failures.push(err);
        } else if self.config.purge_stale_clips {
            match self.storage.purge_clips() {
                Ok(removed) => log::info!("Removed {removed} stale clips"),
                Err(err) => {
                    log::warn!("{err}");
                    report.failures.push(err);
                }
            }
        }

        let manifest = self.build_manifest(lines, &mut report);

        match self.concatenate(manifest) {
            Ok(output) => report.output = Some(output),
            Err(err) => {
                log::error!("{err}");
                report.failures.push(err);
            }
        }

        if self.config.cleanup {
            if let Err(err) = self.cleanup() {
                log::warn!("{err}");
                report.failures.push(err);
            }
        }

        report
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Could not remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::audio::WavEditor;
    use crate::error::{AudioError, SynthesisError};
    use crate::SynthesisResult;

    const RATE: u32 = 8000;

    /// `WavEditor` whose `export` can be made to fail after writing a few
    /// bytes, leaving a truncated file behind.
    struct FlakyEditor {
        inner: WavEditor,
        fail_export: Cell<bool>,
    }

    impl FlakyEditor {
        fn failing() -> Self {
            Self {
                inner: WavEditor::with_sample_rate(RATE),
                fail_export: Cell::new(true),
            }
        }
    }

    impl AudioEditor for FlakyEditor {
        fn load(&self, path: &Path) -> Result<AudioClip, AudioError> {
            self.inner.load(path)
        }

        fn silence(&self, duration_ms: u64) -> Result<AudioClip, AudioError> {
            self.inner.silence(duration_ms)
        }

        fn append(&self, base: AudioClip, next: &AudioClip) -> Result<AudioClip, AudioError> {
            self.inner.append(base, next)
        }

        fn export(
            &self,
            clip: &AudioClip,
            path: &Path,
            format: AudioFormat,
        ) -> Result<(), AudioError> {
            if self.fail_export.get() {
                fs::write(path, b"RIFF")?;
                return Err(AudioError::Io(std::io::Error::other("disk full")));
            }
            self.inner.export(clip, path, format)
        }
    }

    /// Synthesizer that renders each text as a constant tone whose length is
    /// 10 ms per character, and records every call.
    #[derive(Default)]
    struct FakeSynthesizer {
        calls: Vec<(String, String)>,
        fail_on: Option<String>,
    }

    impl SpeechSynthesizer for FakeSynthesizer {
        fn synthesize(
            &mut self,
            text: &str,
            language: &str,
        ) -> Result<SynthesisResult, SynthesisError> {
            self.calls.push((text.to_string(), language.to_string()));
            if self.fail_on.as_deref() == Some(text) {
                return Err(SynthesisError::Failed("service unavailable".to_string()));
            }
            let len = text.chars().count() * RATE as usize / 100;
            Ok(SynthesisResult {
                samples: vec![0.5; len],
                sample_rate: RATE,
            })
        }
    }

    fn config(root: &Path, delay_secs: u64) -> PipelineConfig {
        PipelineConfig {
            delay_secs,
            tmp_dir: root.join("tmp"),
            output_path: root.join("combined_output.wav"),
            ..PipelineConfig::default()
        }
    }

    fn pipeline(
        root: &Path,
        delay_secs: u64,
    ) -> Pipeline<FakeSynthesizer, WavEditor> {
        Pipeline::new(
            config(root, delay_secs),
            FakeSynthesizer::default(),
            WavEditor::with_sample_rate(RATE),
        )
        .unwrap()
    }

    fn samples_for(text: &str) -> usize {
        text.chars().count() * RATE as usize / 100
    }

    #[test]
    fn new_creates_temporary_directory() {
        let root = tempfile::tempdir().unwrap();
        let p = pipeline(root.path(), 1);
        assert!(p.storage().path().is_dir());
        assert_eq!(p.languages().target, "ru");
    }

    #[test]
    fn new_rejects_bad_language_pair() {
        let root = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            languages: "english".to_string(),
            ..config(root.path(), 1)
        };
        let result = Pipeline::new(config, FakeSynthesizer::default(), WavEditor::new());
        assert!(matches!(
            result,
            Err(PipelineError::InvalidLanguagePair { .. })
        ));
    }

    #[test]
    fn builds_clip_source_then_target() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        let entry = TranslationEntry::parse(1, "cat:кот", ":").unwrap();

        let outcome = p.build_clip(&entry).unwrap();
        assert!(matches!(outcome, ClipOutcome::Built(_)));
        assert_eq!(
            p.synthesizer().calls,
            vec![
                ("cat".to_string(), "en".to_string()),
                ("кот".to_string(), "ru".to_string()),
            ]
        );

        let clip = p.editor().load(outcome.path()).unwrap();
        assert_eq!(clip.samples.len(), samples_for("cat") + samples_for("кот"));

        let (first, second) = p.storage().transient_paths();
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn second_build_reuses_existing_clip() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        let entry = TranslationEntry::parse(1, "cat:кот", ":").unwrap();

        let first = p.build_clip(&entry).unwrap();
        let calls = p.synthesizer().calls.len();
        let second = p.build_clip(&entry).unwrap();

        assert_eq!(second, ClipOutcome::Reused(first.path().to_path_buf()));
        assert_eq!(p.synthesizer().calls.len(), calls);
    }

    #[test]
    fn clip_name_replaces_spaces_in_source_word() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        let entry = TranslationEntry::parse(1, "hello world:привет", ":").unwrap();

        let outcome = p.build_clip(&entry).unwrap();
        assert_eq!(
            outcome.path().file_name().unwrap().to_str(),
            Some("hello_world.wav")
        );
        assert!(outcome.path().exists());
    }

    #[test]
    fn failed_synthesis_leaves_no_clip_behind() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.synthesizer.fail_on = Some("кот".to_string());
        let entry = TranslationEntry::parse(1, "cat:кот", ":").unwrap();

        let err = p.build_clip(&entry).unwrap_err();
        assert!(matches!(
            &err,
            PipelineError::Synthesis { text, language, .. } if text == "кот" && language == "ru"
        ));
        assert!(!p.storage().clip_path("cat").exists());
        let (first, _) = p.storage().transient_paths();
        assert!(!first.exists());
    }

    #[test]
    fn failed_concatenation_removes_partial_clip_and_rebuilds_later() {
        let root = tempfile::tempdir().unwrap();
        let mut p = Pipeline::new(
            config(root.path(), 1),
            FakeSynthesizer::default(),
            FlakyEditor::failing(),
        )
        .unwrap();
        let entry = TranslationEntry::parse(1, "cat:кот", ":").unwrap();

        let err = p.build_clip(&entry).unwrap_err();
        let clip_path = p.storage().clip_path("cat");
        assert!(matches!(
            &err,
            PipelineError::Concatenation { output, .. } if *output == clip_path
        ));
        assert!(!clip_path.exists());
        let (first, second) = p.storage().transient_paths();
        assert!(!first.exists());
        assert!(!second.exists());

        p.editor().fail_export.set(false);
        p.synthesizer.calls.clear();
        let outcome = p.build_clip(&entry).unwrap();
        assert_eq!(outcome, ClipOutcome::Built(clip_path));
        assert_eq!(p.synthesizer().calls.len(), 2);
    }

    #[test]
    fn source_word_named_like_transient_file_keeps_its_clip() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);

        let report = p.run(["cat:кот", "temp 1:один", "temp_2:два"]);
        assert!(report.is_clean(), "{report}");
        assert_eq!(report.built, 3);
        assert!(p.storage().clip_path("temp 1").exists());
        assert!(p.storage().clip_path("temp_2").exists());

        let output = p.editor().load(report.output.as_deref().unwrap()).unwrap();
        let expected = samples_for("cat")
            + samples_for("кот")
            + samples_for("temp 1")
            + samples_for("один")
            + samples_for("temp_2")
            + samples_for("два")
            + 2 * RATE as usize;
        assert_eq!(output.samples.len(), expected);
    }

    #[test]
    fn run_joins_clips_with_delay_between_them() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 2);

        let report = p.run(["cat:кот", "dog:собака"]);
        assert!(report.is_clean(), "{report}");
        assert_eq!(report.built, 2);
        assert!(p.storage().clip_path("cat").exists());
        assert!(p.storage().clip_path("dog").exists());

        let output = p.editor().load(report.output.as_deref().unwrap()).unwrap();
        let cat = samples_for("cat") + samples_for("кот");
        let dog = samples_for("dog") + samples_for("собака");
        let gap = 2 * RATE as usize;
        assert_eq!(output.samples.len(), cat + gap + dog);

        // [cat/кот][2s silence][dog/собака], nothing after the last clip.
        assert!(output.samples[..cat].iter().all(|&s| s == 0.5));
        assert!(output.samples[cat..cat + gap].iter().all(|&s| s == 0.0));
        assert!(output.samples[cat + gap..].iter().all(|&s| s == 0.5));
    }

    #[test]
    fn run_skips_malformed_lines() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        let mut report = RunReport::default();

        let manifest = p.build_manifest(["cat:кот", "standalone", "dog:собака"], &mut report);
        assert_eq!(manifest.len(), 2);
        assert_eq!(report.lines, 3);
        assert!(matches!(
            report.failures.as_slice(),
            [PipelineError::MalformedEntry { index: 2, .. }]
        ));
        assert_eq!(
            manifest.paths(),
            &[p.storage().clip_path("cat"), p.storage().clip_path("dog")]
        );
    }

    #[test]
    fn failed_entry_is_left_out_of_manifest() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.synthesizer.fail_on = Some("dog".to_string());

        let report = p.run(["cat:кот", "dog:собака", "fish:рыба"]);
        assert_eq!(report.built, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.output.is_some());

        let output = p.editor().load(report.output.as_deref().unwrap()).unwrap();
        let expected = samples_for("cat")
            + samples_for("кот")
            + RATE as usize
            + samples_for("fish")
            + samples_for("рыба");
        assert_eq!(output.samples.len(), expected);
    }

    #[test]
    fn rerun_only_synthesizes_new_entries() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.run(["cat:кот", "dog:собака"]);
        p.synthesizer.calls.clear();

        let report = p.run(["cat:кот", "dog:собака", "fish:рыба"]);
        assert_eq!(report.reused, 2);
        assert_eq!(report.built, 1);
        assert_eq!(
            p.synthesizer().calls,
            vec![
                ("fish".to_string(), "en".to_string()),
                ("рыба".to_string(), "ru".to_string()),
            ]
        );
    }

    #[test]
    fn purge_forces_resynthesis() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.run(["cat:кот"]);
        p.config.purge_stale_clips = true;
        p.synthesizer.calls.clear();

        let report = p.run(["cat:кот"]);
        assert_eq!(report.built, 1);
        assert_eq!(p.synthesizer().calls.len(), 2);
    }

    #[test]
    fn concatenation_fails_on_missing_clip() {
        let root = tempfile::tempdir().unwrap();
        let p = pipeline(root.path(), 1);
        let mut manifest = ClipManifest::new();
        manifest.push(p.storage().clip_path("ghost"));

        assert!(matches!(
            p.concatenate(manifest),
            Err(PipelineError::Concatenation { .. })
        ));
    }

    #[test]
    fn empty_manifest_writes_empty_output() {
        let root = tempfile::tempdir().unwrap();
        let p = pipeline(root.path(), 1);

        let output = p.concatenate(ClipManifest::new()).unwrap();
        assert!(p.editor().load(&output).unwrap().samples.is_empty());
    }

    #[test]
    fn cleanup_after_run_and_again() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.run(["cat:кот"]);

        p.cleanup().unwrap();
        assert!(!p.storage().path().exists());
        assert!(root.path().join("combined_output.wav").exists());
        assert!(matches!(p.cleanup(), Err(PipelineError::Cleanup { .. })));
    }

    #[test]
    fn configured_cleanup_runs_at_end_of_run() {
        let root = tempfile::tempdir().unwrap();
        let mut p = pipeline(root.path(), 1);
        p.config.cleanup = true;

        let report = p.run(["cat:кот"]);
        assert!(report.is_clean(), "{report}");
        assert!(!p.storage().path().exists());

        // The next run recreates the directory.
        let report = p.run(["dog:собака"]);
        assert_eq!(report.built, 1);
        assert!(report.output.is_some());
    }
}
