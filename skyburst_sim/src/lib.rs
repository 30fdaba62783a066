//! Population-to-survey GRB simulation pipeline.
//!
//! One run turns a pre-filtered population file into a directory of
//! per-GRB photon stores and a single survey artifact:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Universe<I>                           │
//! │                                                              │
//! │  population.json ──► validate ──► ParameterServer per member │
//! │                        (skip members whose store exists)     │
//! │                                                              │
//! │  go() ──► serial loop ─────────┐                             │
//! │       └─► Executor (rayon) ────┤  one job per server:        │
//! │                                │  make_grb → run → save →    │
//! │                                │  drop                       │
//! │                                ▼                             │
//! │            {base_name}_{i}_store.h5 per GRB                  │
//! │                                                              │
//! │  save() ──► Survey: every store path + the population path   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The instrument-specific pieces (typed parameters, the GRB physics
//! engine) hang off the [`Instrument`] trait; the GBM variant lives in
//! [`gbm`]. Response matrices come from `skyburst_core`, built once per
//! process and shared by every job.
//!
//! # Usage
//!
//! ```ignore
//! use skyburst_core::{RegistryConfig, ResponseRegistry};
//! use skyburst_sim::{GbmInstrument, RayonExecutor, Universe};
//!
//! let registry = ResponseRegistry::obtain(&RegistryConfig::default())?;
//! let instrument = GbmInstrument::new(registry, 42);
//!
//! let mut universe = Universe::new(instrument, "population.json", "SynthGRB", "out")?;
//! universe.go(Some(&RayonExecutor::new()))?;
//! universe.save("out/survey.h5")?;
//! ```

mod error;
mod executor;
mod gbm;
mod grb;
mod params;
mod population;
mod survey;
mod universe;

pub use error::{GrbError, PopulationError, SurveyError, UniverseError};
pub use executor::{Executor, RayonExecutor};
pub use gbm::{GbmGrb, GbmInstrument, GbmParameters};
pub use grb::{Grb, GrbStore, PhotonList, RunMode};
pub use params::{JobParams, ParameterServer};
pub use population::{Population, SourceRecord};
pub use survey::Survey;
pub use universe::{Instrument, Universe};
