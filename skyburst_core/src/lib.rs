//! Detector response core for a GBM-like gamma-ray instrument.
//!
//! This crate answers one question: *given a detector, a time in the
//! orbit, and a source position on the sky, what is the instrument
//! response matrix?* Everything else (populations, light curves, batch
//! orchestration) lives in `skyburst_sim`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   ResponseRegistry                      │
//! │  one per process, passed as Arc to every call site      │
//! │                                                         │
//! │   DetectorId ──► Mutex<DetectorResponseModel>           │
//! │                    │ calibration (fixed)                │
//! │                    │ pointing history (shared, Arc)     │
//! │                    │ current time / source (mutable)    │
//! │                    └──► ResponseMatrix (chan × energy)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-detector models are expensive to build and are therefore built
//! exactly once per process ([`ResponseRegistry::obtain`]) and reused by
//! every simulated source. Queries mutate the model's current time and
//! pointing; each model is behind its own lock so one query is one atomic
//! mutate-and-read sequence.

mod calibration;
mod detector;
mod error;
mod pointing;
mod registry;
mod response;

pub use calibration::DetectorCalibration;
pub use detector::DetectorId;
pub use error::ResponseError;
pub use pointing::{PointingHistory, PointingSample};
pub use registry::{RegistryConfig, ResponseRegistry};
pub use response::{DetectorResponseModel, ResponseMatrix};
