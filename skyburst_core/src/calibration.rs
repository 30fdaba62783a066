//! Per-detector energy calibration data.

use crate::detector::DetectorId;
use crate::error::ResponseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Energy calibration for one detector.
///
/// Holds the Monte Carlo input-energy bin edges and the output channel
/// energy bounds, both in keV. Loaded once at registry construction and
/// shared by every response query for that detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorCalibration {
    /// Detector this calibration belongs to
    pub detector: DetectorId,

    /// Monte Carlo input energy bin edges (keV), strictly increasing
    pub mc_energies: Vec<f64>,

    /// Output channel energy bounds (keV), strictly increasing
    pub ebounds: Vec<f64>,
}

fn strictly_increasing(edges: &[f64]) -> bool {
    edges.windows(2).all(|w| w[0] < w[1])
}

/// Log-spaced bin edges from `lo` to `hi` (keV).
fn log_edges(lo: f64, hi: f64, n_bins: usize) -> Vec<f64> {
    let (llo, lhi) = (lo.ln(), hi.ln());
    (0..=n_bins)
        .map(|i| (llo + (lhi - llo) * i as f64 / n_bins as f64).exp())
        .collect()
}

impl DetectorCalibration {
    /// Loads a calibration from a JSON file.
    pub fn from_file(detector: DetectorId, path: &Path) -> Result<Self, ResponseError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ResponseError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let cal: DetectorCalibration =
            serde_json::from_str(&raw).map_err(|source| ResponseError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if cal.detector != detector {
            return Err(ResponseError::calibration(
                detector,
                format!("file {} is for detector {}", path.display(), cal.detector),
            ));
        }

        cal.validate()?;
        Ok(cal)
    }

    /// Builds a synthetic log-spaced calibration for the detector's band.
    ///
    /// Used when no measured calibration file is available (and by tests).
    pub fn synthetic(detector: DetectorId) -> Self {
        let (lo, hi) = if detector.is_bgo() {
            (200.0, 40_000.0)
        } else {
            (8.0, 1_000.0)
        };

        Self {
            detector,
            mc_energies: log_edges(lo, hi, 140),
            ebounds: log_edges(lo, hi, 128),
        }
    }

    /// Checks the bin-edge invariants.
    pub fn validate(&self) -> Result<(), ResponseError> {
        if self.mc_energies.len() < 2 {
            return Err(ResponseError::calibration(
                self.detector,
                "mc_energies needs at least two edges",
            ));
        }
        if self.ebounds.len() < 2 {
            return Err(ResponseError::calibration(
                self.detector,
                "ebounds needs at least two edges",
            ));
        }
        if !strictly_increasing(&self.mc_energies) {
            return Err(ResponseError::calibration(
                self.detector,
                "mc_energies must be strictly increasing",
            ));
        }
        if !strictly_increasing(&self.ebounds) {
            return Err(ResponseError::calibration(
                self.detector,
                "ebounds must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// Number of Monte Carlo input energy bins.
    pub fn n_mc_bins(&self) -> usize {
        self.mc_energies.len() - 1
    }

    /// Number of output channels.
    pub fn n_channels(&self) -> usize {
        self.ebounds.len() - 1
    }

    /// Geometric midpoints of the Monte Carlo bins (keV).
    pub fn mc_centers(&self) -> Vec<f64> {
        self.mc_energies
            .windows(2)
            .map(|w| (w[0] * w[1]).sqrt())
            .collect()
    }

    /// Geometric midpoints of the output channels (keV).
    pub fn channel_centers(&self) -> Vec<f64> {
        self.ebounds.windows(2).map(|w| (w[0] * w[1]).sqrt()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_bands() {
        let nai = DetectorCalibration::synthetic(DetectorId::N3);
        assert_eq!(nai.n_mc_bins(), 140);
        assert_eq!(nai.n_channels(), 128);
        assert!(nai.mc_energies[0] < 10.0);
        assert!(*nai.mc_energies.last().unwrap() <= 1_000.0 + 1e-6);

        let bgo = DetectorCalibration::synthetic(DetectorId::B0);
        assert!(bgo.mc_energies[0] >= 200.0 - 1e-6);
        assert!(*bgo.mc_energies.last().unwrap() > 10_000.0);
    }

    #[test]
    fn test_validate_rejects_unsorted_edges() {
        let mut cal = DetectorCalibration::synthetic(DetectorId::N0);
        cal.mc_energies[5] = cal.mc_energies[4]; // not strictly increasing
        assert!(cal.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n7.json");

        let cal = DetectorCalibration::synthetic(DetectorId::N7);
        std::fs::write(&path, serde_json::to_string(&cal).unwrap()).unwrap();

        let loaded = DetectorCalibration::from_file(DetectorId::N7, &path).unwrap();
        assert_eq!(loaded.n_channels(), cal.n_channels());

        // Wrong detector identity is rejected
        assert!(DetectorCalibration::from_file(DetectorId::N8, &path).is_err());
    }
}
