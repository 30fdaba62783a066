//! The aggregate survey artifact.

use crate::error::SurveyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bundles every per-GRB store file of a run, together with the source
/// population file, into one artifact.
///
/// The survey references the store files by path rather than embedding
/// them; the heavy per-GRB payloads stay in their own files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    /// Number of GRBs in the run (including any pre-existing stores)
    pub n_grbs: usize,

    /// Absolute paths of every per-GRB store file
    pub grb_files: Vec<PathBuf>,

    /// Absolute path of the source population file
    pub population_file: PathBuf,
}

impl Survey {
    /// Creates a survey over the given store files.
    pub fn new(grb_files: Vec<PathBuf>, population_file: PathBuf) -> Self {
        Self {
            n_grbs: grb_files.len(),
            grb_files,
            population_file,
        }
    }

    /// Writes the survey to a JSON file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), SurveyError> {
        let path = path.as_ref();
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload).map_err(|source| SurveyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("wrote survey of {} GRBs to {}", self.n_grbs, path.display());
        Ok(())
    }

    /// Reads a survey back from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SurveyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SurveyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
