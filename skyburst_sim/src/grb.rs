//! The GRB physics-engine seam and its persisted store format.

use crate::error::GrbError;
use serde::{Deserialize, Serialize};
use skyburst_core::DetectorId;
use std::path::Path;

/// Whether a GRB's internal work runs on one thread or fans out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Everything on the calling thread
    Serial,

    /// Per-detector work may fan out over the local thread pool
    Parallel,
}

/// One GRB simulation instance.
///
/// Ephemeral by contract: a job invocation constructs the GRB, calls
/// [`run`](Grb::run), persists it with [`save`](Grb::save) (requesting
/// cleanup of heavy intermediate state), and drops it. Instances are never
/// held across jobs, so per-GRB photon lists cannot accumulate over a
/// batch.
pub trait Grb: Send {
    /// Runs the simulation, querying the response registry across the
    /// burst duration.
    fn run(&mut self, mode: RunMode) -> Result<(), GrbError>;

    /// Persists the result to `path`; `cleanup` releases the photon lists
    /// after writing.
    fn save(&mut self, path: &Path, cleanup: bool) -> Result<(), GrbError>;
}

/// Photon arrival list for one detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotonList {
    /// Detector that recorded the photons
    pub detector: DetectorId,

    /// Arrival times relative to the trigger (seconds), ascending
    pub times: Vec<f64>,

    /// Output channel of each photon
    pub channels: Vec<u16>,
}

impl PhotonList {
    /// Number of recorded photons.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if no photons were recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// On-disk payload of one `{name}_store.h5` file.
///
/// The store back-end's encoding is its own concern; only the path naming
/// contract is shared with the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrbStore {
    /// Job name (`{base_name}_{index}`)
    pub name: String,

    /// Source right ascension (degrees)
    pub ra: f64,

    /// Source declination (degrees)
    pub dec: f64,

    /// Source redshift
    pub z: f64,

    /// Burst duration (seconds)
    pub duration: f64,

    /// Trigger time relative to the registry epoch (seconds)
    pub t0: f64,

    /// Per-detector photon lists
    pub lightcurves: Vec<PhotonList>,
}

impl GrbStore {
    /// Writes the store to a file.
    pub fn write(&self, path: &Path) -> Result<(), GrbError> {
        let payload = serde_json::to_string(self)?;
        std::fs::write(path, payload).map_err(|source| GrbError::Store {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reads a store back from a file.
    pub fn from_file(path: &Path) -> Result<Self, GrbError> {
        let raw = std::fs::read_to_string(path).map_err(|source| GrbError::Store {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
