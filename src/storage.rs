//! Scratch directory holding transient and per-pair clips.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::CLIP_EXTENSION;
use crate::error::PipelineError;

/// Subdirectory for the single-word recordings. Clips for path-safe words are
/// plain files directly in the scratch directory and never land in here.
const TRANSIENT_DIR: &str = ".part";
const TRANSIENT_SOURCE: &str = "temp_1";
const TRANSIENT_TARGET: &str = "temp_2";

/// File stem used for a word's clip: spaces become underscores, nothing else
/// is escaped.
pub fn clip_stem(word: &str) -> String {
    word.replace(' ', "_")
}

/// Temporary directory owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct TempStorage {
    dir: PathBuf,
}

impl TempStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Create the directory (and parents) unless it already exists.
    pub fn ensure(&self) -> Result<(), PipelineError> {
        let transient = self.dir.join(TRANSIENT_DIR);
        fs::create_dir_all(&transient).map_err(|source| PipelineError::Storage {
            path: transient,
            source,
        })
    }

    /// Cached clip location for a source word.
    pub fn clip_path(&self, source_word: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{CLIP_EXTENSION}", clip_stem(source_word)))
    }

    /// Fixed locations for the two single-word recordings of the pair being
    /// built.
    pub fn transient_paths(&self) -> (PathBuf, PathBuf) {
        let transient = self.dir.join(TRANSIENT_DIR);
        (
            transient.join(format!("{TRANSIENT_SOURCE}.{CLIP_EXTENSION}")),
            transient.join(format!("{TRANSIENT_TARGET}.{CLIP_EXTENSION}")),
        )
    }

    /// Delete every clip file in the directory. Returns how many were removed.
    pub fn purge_clips(&self) -> Result<usize, PipelineError> {
        let storage_err = |source| PipelineError::Storage {
            path: self.dir.clone(),
            source,
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(storage_err)? {
            let path = entry.map_err(storage_err)?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(CLIP_EXTENSION)
            {
                fs::remove_file(&path).map_err(|source| PipelineError::Storage {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove the directory and everything left in it.
    pub fn remove(&self) -> Result<(), PipelineError> {
        fs::remove_dir_all(&self.dir).map_err(|source| PipelineError::Cleanup {
            path: self.dir.clone(),
            source,
        })
    }
}
