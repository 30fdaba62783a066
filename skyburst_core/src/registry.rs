//! The response registry: one long-lived model per detector.

use crate::calibration::DetectorCalibration;
use crate::detector::DetectorId;
use crate::error::ResponseError;
use crate::pointing::PointingHistory;
use crate::response::{DetectorResponseModel, ResponseMatrix};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info};

/// Where the registry finds its calibration and pointing inputs.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Directory holding one `{code}.json` calibration file per detector;
    /// `None` falls back to synthetic log-spaced calibrations
    pub calibration_dir: Option<PathBuf>,

    /// Shared spacecraft pointing-history file; `None` falls back to a
    /// synthetic orbit
    pub pointing_file: Option<PathBuf>,
}

/// Process-wide cache for [`ResponseRegistry::obtain`].
static SHARED: OnceLock<Arc<ResponseRegistry>> = OnceLock::new();

/// Maps every detector identity to one response model.
///
/// Models are expensive to build, so the registry is constructed once per
/// process and passed explicitly (`Arc<ResponseRegistry>`) to every call
/// site that needs response queries. Each model sits behind its own
/// `Mutex`: a query is one atomic mutate-and-read sequence per detector,
/// so concurrent jobs within a process cannot interleave a time write with
/// another job's location write.
pub struct ResponseRegistry {
    /// Per-detector models, each serialized behind its own lock
    detectors: BTreeMap<DetectorId, Mutex<DetectorResponseModel>>,

    /// Per-detector Monte Carlo energy bin edges (keV)
    mc_energies: BTreeMap<DetectorId, Vec<f64>>,

    /// Per-detector output channel bounds (keV)
    ebounds: BTreeMap<DetectorId, Vec<f64>>,

    /// Reference epoch: minimum MET of the pointing history
    t0: f64,
}

impl ResponseRegistry {
    /// Builds a registry from explicit per-detector models.
    pub fn new(models: Vec<DetectorResponseModel>, t0: f64) -> Self {
        let mut detectors = BTreeMap::new();
        let mut mc_energies = BTreeMap::new();
        let mut ebounds = BTreeMap::new();

        for model in models {
            let id = model.id();
            mc_energies.insert(id, model.calibration().mc_energies.clone());
            ebounds.insert(id, model.calibration().ebounds.clone());
            detectors.insert(id, Mutex::new(model));
        }

        Self {
            detectors,
            mc_energies,
            ebounds,
            t0,
        }
    }

    /// Builds one model per detector from a config, loading calibration
    /// files and the shared pointing history when paths are given.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ResponseError> {
        let pointing = match &config.pointing_file {
            Some(path) => Arc::new(PointingHistory::from_file(path)?),
            None => Arc::new(PointingHistory::synthetic(0.0, 86_400.0, 30.0)),
        };

        let t0 = pointing.t0();
        debug!("creating response generators (T0 = {})", t0);

        let mut models = Vec::with_capacity(14);
        for id in DetectorId::all() {
            let calibration = match &config.calibration_dir {
                Some(dir) => {
                    DetectorCalibration::from_file(id, &dir.join(format!("{}.json", id.code())))?
                }
                None => DetectorCalibration::synthetic(id),
            };

            models.push(DetectorResponseModel::new(id, calibration, pointing.clone()));
            debug!("created {} response generator", id);
        }

        info!("response registry ready: {} detectors", models.len());
        Ok(Self::new(models, t0))
    }

    /// Returns the process-wide registry, building it on first call.
    ///
    /// Construction is idempotent: repeated calls return the already-built
    /// instance and ignore the config.
    pub fn obtain(config: &RegistryConfig) -> Result<Arc<Self>, ResponseError> {
        if let Some(existing) = SHARED.get() {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(Self::from_config(config)?);
        Ok(Arc::clone(SHARED.get_or_init(|| built)))
    }

    /// Reference epoch all query times are relative to.
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Registered detector identities, in canonical order.
    pub fn detectors(&self) -> Vec<DetectorId> {
        self.detectors.keys().copied().collect()
    }

    /// Monte Carlo energy bin edges for a detector.
    pub fn mc_energies(&self, detector: DetectorId) -> Result<&[f64], ResponseError> {
        self.mc_energies
            .get(&detector)
            .map(|v| v.as_slice())
            .ok_or_else(|| ResponseError::unknown(detector))
    }

    /// Output channel bounds for a detector.
    pub fn ebounds(&self, detector: DetectorId) -> Result<&[f64], ResponseError> {
        self.ebounds
            .get(&detector)
            .map(|v| v.as_slice())
            .ok_or_else(|| ResponseError::unknown(detector))
    }

    fn model(&self, detector: DetectorId) -> Result<&Mutex<DetectorResponseModel>, ResponseError> {
        self.detectors
            .get(&detector)
            .ok_or_else(|| ResponseError::unknown(detector))
    }

    /// Sets time, then location, then returns the matrix for the detector.
    pub fn get_response(
        &self,
        detector: DetectorId,
        ra: f64,
        dec: f64,
        time: f64,
    ) -> Result<ResponseMatrix, ResponseError> {
        let mut model = self.model(detector)?.lock().unwrap();
        model.set_time(time);
        model.set_location(ra, dec);
        Ok(model.response())
    }

    /// The atomic query form: all inputs at once, one lock acquisition.
    ///
    /// Equivalent to [`get_response`](Self::get_response) but with the
    /// time-first argument order matching the query semantics.
    pub fn compute_response(
        &self,
        detector: DetectorId,
        time: f64,
        ra: f64,
        dec: f64,
    ) -> Result<ResponseMatrix, ResponseError> {
        self.get_response(detector, ra, dec, time)
    }

    /// Warms the current time of one detector's model.
    pub fn set_time(&self, detector: DetectorId, time: f64) -> Result<(), ResponseError> {
        self.model(detector)?.lock().unwrap().set_time(time);
        Ok(())
    }

    /// Warms the current pointing of one detector's model and returns the
    /// matrix at the previously set time.
    pub fn set_location(
        &self,
        detector: DetectorId,
        ra: f64,
        dec: f64,
    ) -> Result<ResponseMatrix, ResponseError> {
        let mut model = self.model(detector)?.lock().unwrap();
        model.set_location(ra, dec);
        Ok(model.response())
    }
}

impl std::fmt::Debug for ResponseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRegistry")
            .field("detectors", &self.detectors.keys().collect::<Vec<_>>())
            .field("t0", &self.t0)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_registry() -> ResponseRegistry {
        ResponseRegistry::from_config(&RegistryConfig::default()).unwrap()
    }

    fn partial_registry() -> ResponseRegistry {
        // Only two detectors registered, so the rest are unknown
        let pointing = Arc::new(PointingHistory::synthetic(500.0, 1_000.0, 10.0));
        let models = vec![
            DetectorResponseModel::new(
                DetectorId::N0,
                DetectorCalibration::synthetic(DetectorId::N0),
                pointing.clone(),
            ),
            DetectorResponseModel::new(
                DetectorId::B1,
                DetectorCalibration::synthetic(DetectorId::B1),
                pointing.clone(),
            ),
        ];
        ResponseRegistry::new(models, pointing.t0())
    }

    #[test]
    fn test_all_detectors_registered() {
        let registry = test_registry();
        assert_eq!(registry.detectors().len(), 14);
        for det in DetectorId::all() {
            assert!(registry.mc_energies(det).is_ok());
            assert!(registry.ebounds(det).is_ok());
        }
    }

    #[test]
    fn test_unknown_detector_rejected() {
        let registry = partial_registry();
        for det in [DetectorId::N5, DetectorId::Na, DetectorId::B0] {
            let err = registry.get_response(det, 0.0, 0.0, 0.0).unwrap_err();
            assert!(matches!(err, ResponseError::UnknownDetector(_)));
            assert!(registry.set_time(det, 1.0).is_err());
            assert!(registry.set_location(det, 0.0, 0.0).is_err());
        }
    }

    #[test]
    fn test_obtain_is_idempotent() {
        let first = ResponseRegistry::obtain(&RegistryConfig::default()).unwrap();
        let second = ResponseRegistry::obtain(&RegistryConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_setter_sequence_matches_atomic_query() {
        let registry = test_registry();
        let det = DetectorId::N3;

        registry.set_time(det, 420.0).unwrap();
        let staged = registry.set_location(det, 150.0, -30.0).unwrap();

        let atomic = registry.compute_response(det, 420.0, 150.0, -30.0).unwrap();

        assert_relative_eq!(
            staged.matrix[(64, 70)],
            atomic.matrix[(64, 70)],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_t0_comes_from_pointing_history() {
        let registry = partial_registry();
        assert_relative_eq!(registry.t0(), 500.0);
    }
}
