//! Per-job parameter servers.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// The typed parameter record one instrument variant hands to its GRB
/// constructor.
///
/// Every variant carries at least `name, ra, dec, z, duration, t0`;
/// instrument-specific scalars are additional named fields on the concrete
/// type, never an open key/value bag (unknown keys are rejected at
/// deserialization).
pub trait JobParams: Clone + Send + Sync + Serialize {
    /// The job's unique name (`{base_name}_{index}`).
    fn name(&self) -> &str;
}

/// An immutable parameter bundle plus its assigned output file path.
///
/// Owned by the Universe until a job invocation borrows it, after which it
/// is read-only input. The file path is assigned exactly once, at
/// construction, before the server can be scheduled.
#[derive(Debug, Clone)]
pub struct ParameterServer<P: JobParams> {
    params: P,
    file_path: PathBuf,
}

impl<P: JobParams> ParameterServer<P> {
    /// Binds a parameter record to its output path.
    pub fn new(params: P, file_path: PathBuf) -> Self {
        Self { params, file_path }
    }

    /// The job's parameters.
    pub fn params(&self) -> &P {
        &self.params
    }

    /// The job's name.
    pub fn name(&self) -> &str {
        self.params.name()
    }

    /// Where the job's store file goes.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl<P: JobParams> std::fmt::Display for ParameterServer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.name(), self.file_path.display())
    }
}
