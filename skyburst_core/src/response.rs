//! Per-detector response models and response matrices.

use crate::calibration::DetectorCalibration;
use crate::detector::DetectorId;
use crate::pointing::PointingHistory;
use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A response matrix in the canonical (output-channel, input-energy)
/// orientation, bundled with the energy axes it was computed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMatrix {
    /// Detector the matrix belongs to
    pub detector: DetectorId,

    /// Matrix entries, `n_channels` rows by `n_mc_bins` columns (cm^2)
    pub matrix: DMatrix<f64>,

    /// Monte Carlo input energy bin edges (keV)
    pub mc_energies: Vec<f64>,

    /// Output channel energy bounds (keV)
    pub ebounds: Vec<f64>,
}

impl ResponseMatrix {
    /// Number of output channels (rows).
    pub fn n_channels(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of Monte Carlo input energy bins (columns).
    pub fn n_mc_bins(&self) -> usize {
        self.matrix.ncols()
    }

    /// Folds a photon spectrum through the response.
    ///
    /// `photon_flux` evaluates the differential photon flux
    /// (photons / cm^2 / s / keV) at an energy in keV; the result is the
    /// expected count rate per output channel (counts / s).
    pub fn fold<F>(&self, photon_flux: F) -> Vec<f64>
    where
        F: Fn(f64) -> f64,
    {
        let mut rates = vec![0.0; self.n_channels()];

        for (j, w) in self.mc_energies.windows(2).enumerate() {
            let center = (w[0] * w[1]).sqrt();
            let width = w[1] - w[0];
            let flux = photon_flux(center) * width;

            for (i, rate) in rates.iter_mut().enumerate() {
                *rate += self.matrix[(i, j)] * flux;
            }
        }

        rates
    }
}

/// Unit vector from equatorial coordinates (degrees).
fn sky_vector(ra_deg: f64, dec_deg: f64) -> Vector3<f64> {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
}

/// One long-lived response model for a single detector.
///
/// Expensive to construct (calibration load, pointing attach), so the
/// registry builds exactly one per detector and mutates its current time
/// and source pointing on every query. State persists between calls: there
/// is no default reset, a query reflects the last-set time *and* the
/// last-set location.
#[derive(Debug)]
pub struct DetectorResponseModel {
    /// Detector identity
    id: DetectorId,

    /// Fixed energy calibration
    calibration: DetectorCalibration,

    /// Shared spacecraft attitude history
    pointing: Arc<PointingHistory>,

    /// Reference epoch (minimum MET in the pointing history)
    t0: f64,

    /// Current query time, relative to `t0` (seconds)
    current_time: f64,

    /// Current source pointing (ra, dec in degrees)
    current_ra: f64,
    current_dec: f64,
}

impl DetectorResponseModel {
    /// Creates a model with its state at the reference epoch, pointing at
    /// the celestial origin.
    pub fn new(
        id: DetectorId,
        calibration: DetectorCalibration,
        pointing: Arc<PointingHistory>,
    ) -> Self {
        let t0 = pointing.t0();
        Self {
            id,
            calibration,
            pointing,
            t0,
            current_time: 0.0,
            current_ra: 0.0,
            current_dec: 0.0,
        }
    }

    /// Detector identity.
    pub fn id(&self) -> DetectorId {
        self.id
    }

    /// The fixed calibration for this detector.
    pub fn calibration(&self) -> &DetectorCalibration {
        &self.calibration
    }

    /// Sets the current query time, relative to the reference epoch.
    pub fn set_time(&mut self, time: f64) {
        debug!("setting time of {} to {}", self.id, time);
        self.current_time = time;
    }

    /// Sets the current source pointing (degrees).
    pub fn set_location(&mut self, ra: f64, dec: f64) {
        debug!("setting location of {} to {}, {}", self.id, ra, dec);
        self.current_ra = ra;
        self.current_dec = dec;
    }

    /// Cosine-like exposure factor of the source against the detector axis
    /// at the current spacecraft attitude.
    fn exposure_factor(&self) -> f64 {
        let (ra_z, dec_z) = self.pointing.pointing_at(self.t0 + self.current_time);

        // Spacecraft frame: z from the attitude history, x toward the
        // projection of celestial north, y completing the triad.
        let z = sky_vector(ra_z, dec_z);
        let pole = Vector3::new(0.0, 0.0, 1.0);
        let mut x = pole - z * pole.dot(&z);
        if x.norm() < 1e-9 {
            x = Vector3::new(1.0, 0.0, 0.0);
        } else {
            x.normalize_mut();
        }
        let y = z.cross(&x);

        let (az, zen) = self.id.axis();
        let axis = x * (zen.sin() * az.cos()) + y * (zen.sin() * az.sin()) + z * zen.cos();

        let cos_sep = axis.dot(&sky_vector(self.current_ra, self.current_dec));

        // Smoothed projection: photons arriving from behind still scatter
        // into the crystal through the spacecraft, so the response never
        // drops fully to zero.
        0.5 * (1.0 + cos_sep)
    }

    /// On-axis effective area (cm^2) at an input energy (keV).
    fn effective_area(&self, energy: f64) -> f64 {
        let (peak_area, peak_energy, width): (f64, f64, f64) = if self.id.is_bgo() {
            (120.0, 2_000.0, 2.0)
        } else {
            (126.0, 100.0, 1.5)
        };
        let x = (energy.ln() - peak_energy.ln()) / width;
        peak_area * (-0.5 * x * x).exp()
    }

    /// Computes the response matrix for the current time and pointing,
    /// in the native (input-energy, output-channel) orientation.
    pub fn matrix(&self) -> DMatrix<f64> {
        let exposure = self.exposure_factor();
        let mc_centers = self.calibration.mc_centers();
        let channel_centers = self.calibration.channel_centers();

        let n_mc = self.calibration.n_mc_bins();
        let n_chan = self.calibration.n_channels();

        // Fractional energy resolution of the redistribution kernel
        let sigma = if self.id.is_bgo() { 0.15 } else { 0.10 };

        DMatrix::from_fn(n_mc, n_chan, |j, i| {
            let area = self.effective_area(mc_centers[j]) * exposure;
            let x = (channel_centers[i].ln() - mc_centers[j].ln()) / sigma;
            let kernel = (-0.5 * x * x).exp();
            area * kernel / (sigma * (std::f64::consts::TAU).sqrt())
        })
    }

    /// Computes the matrix in the canonical (channel, energy) orientation,
    /// bundled with the energy axes.
    pub fn response(&self) -> ResponseMatrix {
        ResponseMatrix {
            detector: self.id,
            matrix: self.matrix().transpose(),
            mc_energies: self.calibration.mc_energies.clone(),
            ebounds: self.calibration.ebounds.clone(),
        }
    }
}
