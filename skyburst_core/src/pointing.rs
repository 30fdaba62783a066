//! Spacecraft pointing history over an orbit.

use crate::error::ResponseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One attitude sample: where the spacecraft z-axis points at a given
/// mission-elapsed time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointingSample {
    /// Mission-elapsed time (seconds)
    pub met: f64,

    /// Right ascension of the spacecraft z-axis (degrees)
    pub ra_z: f64,

    /// Declination of the spacecraft z-axis (degrees)
    pub dec_z: f64,
}

/// Ordered attitude history shared by every detector model.
///
/// All response times are expressed relative to [`PointingHistory::t0`],
/// the minimum mission-elapsed time in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointingHistory {
    samples: Vec<PointingSample>,
}

impl PointingHistory {
    /// Builds a history from raw samples, enforcing ordering invariants.
    pub fn new(samples: Vec<PointingSample>) -> Result<Self, ResponseError> {
        if samples.is_empty() {
            return Err(ResponseError::Pointing(
                "pointing history is empty".to_string(),
            ));
        }
        if !samples.windows(2).all(|w| w[0].met < w[1].met) {
            return Err(ResponseError::Pointing(
                "pointing history MET values must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { samples })
    }

    /// Loads a pointing history from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ResponseError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ResponseError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let samples: Vec<PointingSample> =
            serde_json::from_str(&raw).map_err(|source| ResponseError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        Self::new(samples)
    }

    /// The reference epoch: minimum MET across the history.
    pub fn t0(&self) -> f64 {
        self.samples[0].met
    }

    /// Interpolated z-axis pointing (ra, dec in degrees) at an absolute MET.
    ///
    /// Times outside the history are clamped to the first/last sample.
    pub fn pointing_at(&self, met: f64) -> (f64, f64) {
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];

        if met <= first.met {
            return (first.ra_z, first.dec_z);
        }
        if met >= last.met {
            return (last.ra_z, last.dec_z);
        }

        let idx = self
            .samples
            .partition_point(|s| s.met <= met)
            .saturating_sub(1);
        let (a, b) = (self.samples[idx], self.samples[idx + 1]);
        let frac = (met - a.met) / (b.met - a.met);

        // Linear interpolation is adequate at the sampling cadence of a
        // pointing-history file; the ra wrap at 360 is handled by taking
        // the short way around.
        let mut dra = b.ra_z - a.ra_z;
        if dra > 180.0 {
            dra -= 360.0;
        } else if dra < -180.0 {
            dra += 360.0;
        }

        let ra = (a.ra_z + frac * dra).rem_euclid(360.0);
        let dec = a.dec_z + frac * (b.dec_z - a.dec_z);
        (ra, dec)
    }

    /// Number of samples in the history.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the history holds no samples (never constructible, kept for
    /// API completeness).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// A slowly rotating synthetic orbit for tests and demos.
    pub fn synthetic(t0: f64, duration: f64, step: f64) -> Self {
        let n = (duration / step).ceil() as usize + 1;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 * step;
                PointingSample {
                    met: t0 + t,
                    // one full yaw revolution per orbit (~5730 s)
                    ra_z: (t / 5730.0 * 360.0).rem_euclid(360.0),
                    dec_z: 15.0 * (t / 5730.0 * std::f64::consts::TAU).sin(),
                }
            })
            .collect();
        Self { samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_t0_is_minimum_met() {
        let hist = PointingHistory::synthetic(12_345.0, 100.0, 10.0);
        assert_relative_eq!(hist.t0(), 12_345.0);
    }

    #[test]
    fn test_empty_history_rejected() {
        assert!(PointingHistory::new(vec![]).is_err());
    }

    #[test]
    fn test_unsorted_history_rejected() {
        let samples = vec![
            PointingSample { met: 10.0, ra_z: 0.0, dec_z: 0.0 },
            PointingSample { met: 5.0, ra_z: 1.0, dec_z: 0.0 },
        ];
        assert!(PointingHistory::new(samples).is_err());
    }

    #[test]
    fn test_interpolation_and_clamping() {
        let samples = vec![
            PointingSample { met: 0.0, ra_z: 10.0, dec_z: -10.0 },
            PointingSample { met: 100.0, ra_z: 30.0, dec_z: 10.0 },
        ];
        let hist = PointingHistory::new(samples).unwrap();

        let (ra, dec) = hist.pointing_at(50.0);
        assert_relative_eq!(ra, 20.0, epsilon = 1e-9);
        assert_relative_eq!(dec, 0.0, epsilon = 1e-9);

        // Before the first and after the last sample: clamped
        assert_relative_eq!(hist.pointing_at(-5.0).0, 10.0);
        assert_relative_eq!(hist.pointing_at(500.0).0, 30.0);
    }

    #[test]
    fn test_ra_wrap_interpolates_short_way() {
        let samples = vec![
            PointingSample { met: 0.0, ra_z: 350.0, dec_z: 0.0 },
            PointingSample { met: 10.0, ra_z: 10.0, dec_z: 0.0 },
        ];
        let hist = PointingHistory::new(samples).unwrap();
        let (ra, _) = hist.pointing_at(5.0);
        assert_relative_eq!(ra, 0.0, epsilon = 1e-9);
    }
}
