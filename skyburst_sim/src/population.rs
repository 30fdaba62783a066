//! Population ingestion: the read-only source catalog a Universe runs on.

use crate::error::PopulationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One candidate source in a population file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceRecord {
    /// Right ascension (degrees)
    pub ra: f64,

    /// Declination (degrees)
    pub dec: f64,

    /// Redshift
    pub z: f64,

    /// Burst duration (seconds); optional in the schema, required by the
    /// Universe
    #[serde(default)]
    pub duration: Option<f64>,

    /// Survived the population synthesis selection
    pub selected: bool,
}

/// An ordered, read-only collection of candidate sources.
///
/// The population is produced upstream (population synthesis is an
/// external collaborator); this type only reads it, projects it, and
/// validates the pre-filtered invariant.
#[derive(Debug, Clone)]
pub struct Population {
    records: Vec<SourceRecord>,
    path: PathBuf,
}

impl Population {
    /// Reads a population from a JSON file, storing its absolute path so
    /// the survey artifact can reference it later.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PopulationError> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|source| PopulationError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let records: Vec<SourceRecord> =
            serde_json::from_str(&raw).map_err(|source| PopulationError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let absolute = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        debug!(
            "loaded population {}: {} records",
            absolute.display(),
            records.len()
        );

        Ok(Self {
            records,
            path: absolute,
        })
    }

    /// Restricts to the records that survived selection.
    pub fn selected_subset(&self) -> Population {
        Population {
            records: self
                .records
                .iter()
                .filter(|r| r.selected)
                .cloned()
                .collect(),
            path: self.path.clone(),
        }
    }

    /// Fails unless every record is flagged as selected.
    ///
    /// A Universe only accepts pre-filtered sub-populations; an unfiltered
    /// population is a caller error, not something to silently project.
    pub fn ensure_prefiltered(&self) -> Result<(), PopulationError> {
        let n_unselected = self.records.iter().filter(|r| !r.selected).count();
        if n_unselected > 0 {
            return Err(PopulationError::Unfiltered {
                path: self.path.display().to_string(),
                n_unselected,
            });
        }
        Ok(())
    }

    /// Durations for every record, failing if any is absent.
    pub fn durations(&self) -> Result<Vec<f64>, PopulationError> {
        self.records
            .iter()
            .map(|r| {
                r.duration.ok_or_else(|| PopulationError::MissingDuration {
                    path: self.path.display().to_string(),
                })
            })
            .collect()
    }

    /// The records, in population order.
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Absolute path of the source file.
    pub fn absolute_path(&self) -> &Path {
        &self.path
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the population holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(selected: bool, duration: Option<f64>) -> SourceRecord {
        SourceRecord {
            ra: 120.0,
            dec: -30.0,
            z: 1.2,
            duration,
            selected,
        }
    }

    fn write_population(records: &[SourceRecord]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.json");
        std::fs::write(&path, serde_json::to_string_pretty(records).unwrap()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_prefiltered_accepted() {
        let (_dir, path) = write_population(&[record(true, Some(10.0)), record(true, Some(5.0))]);
        let pop = Population::from_file(&path).unwrap();
        assert!(pop.ensure_prefiltered().is_ok());
        assert_eq!(pop.len(), 2);
    }

    #[test]
    fn test_single_unselected_record_rejected() {
        let (_dir, path) = write_population(&[
            record(true, Some(10.0)),
            record(false, Some(5.0)),
            record(true, Some(2.0)),
        ]);
        let pop = Population::from_file(&path).unwrap();
        let err = pop.ensure_prefiltered().unwrap_err();
        assert!(matches!(
            err,
            PopulationError::Unfiltered { n_unselected: 1, .. }
        ));
    }

    #[test]
    fn test_selected_subset_projection() {
        let (_dir, path) = write_population(&[record(true, Some(1.0)), record(false, None)]);
        let pop = Population::from_file(&path).unwrap();
        let sub = pop.selected_subset();
        assert_eq!(sub.len(), 1);
        assert!(sub.ensure_prefiltered().is_ok());
    }

    #[test]
    fn test_missing_duration_rejected() {
        let (_dir, path) = write_population(&[record(true, Some(3.0)), record(true, None)]);
        let pop = Population::from_file(&path).unwrap();
        assert!(matches!(
            pop.durations().unwrap_err(),
            PopulationError::MissingDuration { .. }
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.json");
        std::fs::write(
            &path,
            r#"[{"ra": 1.0, "dec": 2.0, "z": 0.5, "selected": true, "luminosity": 1e52}]"#,
        )
        .unwrap();
        assert!(matches!(
            Population::from_file(&path).unwrap_err(),
            PopulationError::Parse { .. }
        ));
    }
}
