//! Detector identities for the 12-NaI + 2-BGO instrument.

use serde::{Deserialize, Serialize};

/// Identity of one physical detector.
///
/// The instrument carries twelve sodium-iodide detectors (`n0`..`n9`, `na`,
/// `nb`) covering ~8 keV to ~1 MeV and two bismuth-germanate detectors
/// (`b0`, `b1`) covering ~200 keV to ~40 MeV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorId {
    N0,
    N1,
    N2,
    N3,
    N4,
    N5,
    N6,
    N7,
    N8,
    N9,
    Na,
    Nb,
    B0,
    B1,
}

impl DetectorId {
    /// Returns every detector identity in canonical order.
    pub fn all() -> Vec<DetectorId> {
        vec![
            DetectorId::N0,
            DetectorId::N1,
            DetectorId::N2,
            DetectorId::N3,
            DetectorId::N4,
            DetectorId::N5,
            DetectorId::N6,
            DetectorId::N7,
            DetectorId::N8,
            DetectorId::N9,
            DetectorId::Na,
            DetectorId::Nb,
            DetectorId::B0,
            DetectorId::B1,
        ]
    }

    /// Returns the short detector code (e.g. `"n0"`, `"b1"`).
    pub fn code(&self) -> &'static str {
        match self {
            DetectorId::N0 => "n0",
            DetectorId::N1 => "n1",
            DetectorId::N2 => "n2",
            DetectorId::N3 => "n3",
            DetectorId::N4 => "n4",
            DetectorId::N5 => "n5",
            DetectorId::N6 => "n6",
            DetectorId::N7 => "n7",
            DetectorId::N8 => "n8",
            DetectorId::N9 => "n9",
            DetectorId::Na => "na",
            DetectorId::Nb => "nb",
            DetectorId::B0 => "b0",
            DetectorId::B1 => "b1",
        }
    }

    /// Returns the detector axis as (azimuth, zenith) in radians.
    ///
    /// The NaI values follow the flight layout; the BGOs point out the
    /// +x/-x sides of the spacecraft.
    pub fn axis(&self) -> (f64, f64) {
        let (az, zen): (f64, f64) = match self {
            DetectorId::N0 => (45.89, 20.58),
            DetectorId::N1 => (45.11, 45.31),
            DetectorId::N2 => (58.44, 90.21),
            DetectorId::N3 => (314.87, 45.24),
            DetectorId::N4 => (303.15, 90.27),
            DetectorId::N5 => (3.35, 89.79),
            DetectorId::N6 => (224.93, 20.43),
            DetectorId::N7 => (224.62, 46.18),
            DetectorId::N8 => (236.61, 89.97),
            DetectorId::N9 => (135.19, 45.55),
            DetectorId::Na => (123.73, 90.42),
            DetectorId::Nb => (183.74, 90.32),
            DetectorId::B0 => (0.0, 90.0),
            DetectorId::B1 => (180.0, 90.0),
        };
        (az.to_radians(), zen.to_radians())
    }

    /// True for the sodium-iodide detectors.
    pub fn is_nai(&self) -> bool {
        !self.is_bgo()
    }

    /// True for the bismuth-germanate detectors.
    pub fn is_bgo(&self) -> bool {
        matches!(self, DetectorId::B0 | DetectorId::B1)
    }
}

impl std::fmt::Display for DetectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for DetectorId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n0" => Ok(DetectorId::N0),
            "n1" => Ok(DetectorId::N1),
            "n2" => Ok(DetectorId::N2),
            "n3" => Ok(DetectorId::N3),
            "n4" => Ok(DetectorId::N4),
            "n5" => Ok(DetectorId::N5),
            "n6" => Ok(DetectorId::N6),
            "n7" => Ok(DetectorId::N7),
            "n8" => Ok(DetectorId::N8),
            "n9" => Ok(DetectorId::N9),
            "na" => Ok(DetectorId::Na),
            "nb" => Ok(DetectorId::Nb),
            "b0" => Ok(DetectorId::B0),
            "b1" => Ok(DetectorId::B1),
            _ => Err(format!("Unknown detector code: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourteen_detectors() {
        let all = DetectorId::all();
        assert_eq!(all.len(), 14);
        assert_eq!(all.iter().filter(|d| d.is_nai()).count(), 12);
        assert_eq!(all.iter().filter(|d| d.is_bgo()).count(), 2);
    }

    #[test]
    fn test_code_roundtrip() {
        for det in DetectorId::all() {
            let parsed: DetectorId = det.code().parse().unwrap();
            assert_eq!(parsed, det);
        }
    }

    #[test]
    fn test_axes_within_range() {
        for det in DetectorId::all() {
            let (az, zen) = det.axis();
            assert!((0.0..std::f64::consts::TAU).contains(&az), "{}", det);
            assert!((0.0..=std::f64::consts::PI).contains(&zen), "{}", det);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("nc".parse::<DetectorId>().is_err());
        assert!("b2".parse::<DetectorId>().is_err());
    }
}
