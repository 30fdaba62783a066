//! Error types for the simulation pipeline.

use skyburst_core::ResponseError;
use thiserror::Error;

/// Errors raised while ingesting a population file.
#[derive(Debug, Error)]
pub enum PopulationError {
    /// A record's selection flag is false: the population was not
    /// pre-filtered before being handed to the Universe.
    #[error(
        "Population {path} has {n_unselected} unselected records; \
         it looks like a prior selection was not applied"
    )]
    Unfiltered { path: String, n_unselected: usize },

    /// The population schema lacks a duration for at least one record.
    #[error("Population {path} must contain a duration value for every record")]
    MissingDuration { path: String },

    /// Underlying file I/O failed.
    #[error("I/O error reading population {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The population file could not be parsed.
    #[error("Parse error in population {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised inside one GRB's construct/run/save sequence.
#[derive(Debug, Error)]
pub enum GrbError {
    /// A response query failed.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Writing the per-GRB store file failed.
    #[error("Failed to write store {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the store payload failed.
    #[error("Failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while writing the aggregate survey artifact.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Writing the survey file failed.
    #[error("Failed to write survey {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding the survey payload failed.
    #[error("Survey payload error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced by the Universe batch driver.
#[derive(Debug, Error)]
pub enum UniverseError {
    /// Population ingestion or validation failed at construction.
    #[error(transparent)]
    Population(#[from] PopulationError),

    /// One GRB job failed; in serial mode this aborts the batch.
    #[error("GRB job {name} failed: {source}")]
    Job {
        name: String,
        #[source]
        source: GrbError,
    },

    /// The parallel executor could not be set up.
    #[error("Executor error: {0}")]
    Executor(String),

    /// Writing the survey artifact failed.
    #[error(transparent)]
    Survey(#[from] SurveyError),
}
