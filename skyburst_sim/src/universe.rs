//! The Universe: one population file in, one survey of GRB stores out.

use crate::error::{GrbError, UniverseError};
use crate::executor::Executor;
use crate::grb::{Grb, RunMode};
use crate::params::{JobParams, ParameterServer};
use crate::population::Population;
use crate::survey::Survey;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An instrument variant: everything the shared driver cannot know.
///
/// The orchestration itself (naming, skip-on-exists, batch dispatch,
/// saving) lives once in [`Universe`]; a variant only derives its typed
/// per-source parameters and constructs its GRB physics engine.
pub trait Instrument: Send + Sync {
    /// Typed parameter record for one job.
    type Params: JobParams;

    /// The GRB simulation this instrument runs.
    type Grb: Grb;

    /// Short instrument name, used in logs.
    fn name(&self) -> &'static str;

    /// Derives one parameter record per population member, in population
    /// order. `names[i]` is the assigned job name for member `i`.
    fn derive_parameters(
        &self,
        population: &Population,
        names: &[String],
    ) -> Result<Vec<Self::Params>, UniverseError>;

    /// Constructs one GRB from a parameter record.
    fn make_grb(&self, params: &Self::Params) -> Result<Self::Grb, GrbError>;
}

/// Anchors a relative path at the current working directory.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Drives one simulation run: population to parameter servers to per-GRB
/// store files, and finally to one survey artifact.
pub struct Universe<I: Instrument> {
    instrument: I,

    /// Absolute path of the source population file
    population_file: PathBuf,

    /// Base name for generated jobs (`{base_name}_{index}`)
    base_name: String,

    /// Directory the per-GRB store files go to
    save_path: PathBuf,

    /// Total population size, including members whose store already exists
    n_grbs: usize,

    /// Queued jobs (members whose store file does not exist yet)
    parameter_servers: Vec<ParameterServer<I::Params>>,

    /// True once `go()` has completed without a failure
    is_processed: bool,
}

impl<I: Instrument> Universe<I> {
    /// Loads the population and queues one parameter server per member.
    ///
    /// Fails if the population is not pre-filtered or lacks durations.
    /// Members whose target store file already exists are not queued, so a
    /// partially completed batch can be re-launched and only redoes the
    /// missing outputs. The skip check happens here, not at dispatch.
    pub fn new(
        instrument: I,
        population_file: impl AsRef<Path>,
        base_name: &str,
        save_path: impl AsRef<Path>,
    ) -> Result<Self, UniverseError> {
        let save_path = save_path.as_ref().to_path_buf();

        let population = Population::from_file(population_file)?;
        population.ensure_prefiltered()?;

        let n_grbs = population.len();
        debug!("the universe contains {} GRBs", n_grbs);

        let names: Vec<String> = (0..n_grbs)
            .map(|i| format!("{}_{}", base_name, i))
            .collect();

        let params = instrument.derive_parameters(&population, &names)?;

        let mut parameter_servers = Vec::with_capacity(n_grbs);
        for (name, p) in names.iter().zip(params) {
            let file_path = save_path.join(format!("{}_store.h5", name));

            if file_path.exists() {
                info!("{} already exists", file_path.display());
                continue;
            }

            parameter_servers.push(ParameterServer::new(p, file_path));
        }

        info!(
            "{}: {} of {} GRBs queued",
            instrument.name(),
            parameter_servers.len(),
            n_grbs
        );

        Ok(Self {
            instrument,
            population_file: population.absolute_path().to_path_buf(),
            base_name: base_name.to_string(),
            save_path,
            n_grbs,
            parameter_servers,
            is_processed: false,
        })
    }

    /// Total population size.
    pub fn n_grbs(&self) -> usize {
        self.n_grbs
    }

    /// Number of queued jobs (members without an existing store).
    pub fn queued(&self) -> usize {
        self.parameter_servers.len()
    }

    /// True once the batch has completed successfully.
    pub fn is_processed(&self) -> bool {
        self.is_processed
    }

    /// One job: construct the GRB, run it, persist it, drop it.
    ///
    /// No value is returned; success is the existence of the store file.
    fn run_one_job(
        instrument: &I,
        server: &ParameterServer<I::Params>,
        mode: RunMode,
    ) -> Result<(), UniverseError> {
        let job = |source| UniverseError::Job {
            name: server.name().to_string(),
            source,
        };

        let mut grb = instrument.make_grb(server.params()).map_err(job)?;
        grb.run(mode).map_err(job)?;
        grb.save(server.file_path(), true).map_err(job)?;

        // grb dropped here: per-GRB state never outlives its job
        Ok(())
    }

    /// Runs every queued job.
    ///
    /// With no executor the batch runs sequentially on the calling thread
    /// and the first failure aborts the remainder. With an executor the
    /// jobs are scattered across workers and the first failure surfaces
    /// once the batch has drained. Either way, [`save`](Self::save) is
    /// only permitted after a fully successful pass.
    pub fn go(&mut self, executor: Option<&dyn Executor>) -> Result<(), UniverseError> {
        let n_queued = self.parameter_servers.len();

        match executor {
            None => {
                for (i, server) in self.parameter_servers.iter().enumerate() {
                    info!("simulating {} ({}/{})", server.name(), i + 1, n_queued);
                    Self::run_one_job(&self.instrument, server, RunMode::Serial)?;
                }
            }
            Some(executor) => {
                let instrument = &self.instrument;
                let servers = &self.parameter_servers;
                executor.run(n_queued, &|i| {
                    Self::run_one_job(instrument, &servers[i], RunMode::Parallel)
                })?;
            }
        }

        self.is_processed = true;
        info!("processed {} GRBs", n_queued);
        Ok(())
    }

    /// Bundles every expected store file, plus the population file, into
    /// one survey artifact.
    ///
    /// A no-op (with a warning) unless `go()` has completed: a survey is
    /// never invented from a half-run batch. The file list is rebuilt from
    /// the base name and the full population size, not from the queue, so
    /// stores that were skipped as pre-existing are still referenced.
    /// Store paths are absolutized so the survey stays valid when read
    /// from a different working directory.
    pub fn save(&self, output_file: impl AsRef<Path>) -> Result<(), UniverseError> {
        if !self.is_processed {
            warn!("universe has not been processed; not writing a survey");
            return Ok(());
        }

        let save_path = absolutize(&self.save_path);
        let grb_files: Vec<PathBuf> = (0..self.n_grbs)
            .map(|i| save_path.join(format!("{}_{}_store.h5", self.base_name, i)))
            .collect();

        let survey = Survey::new(grb_files, self.population_file.clone());
        survey.write(output_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RayonExecutor;
    use crate::gbm::GbmInstrument;
    use crate::population::SourceRecord;
    use skyburst_core::{RegistryConfig, ResponseRegistry};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn instrument() -> GbmInstrument {
        let registry =
            Arc::new(ResponseRegistry::from_config(&RegistryConfig::default()).unwrap());
        GbmInstrument::new(registry, 42)
    }

    fn record(ra: f64, dec: f64, z: f64, duration: f64) -> SourceRecord {
        SourceRecord {
            ra,
            dec,
            z,
            duration: Some(duration),
            selected: true,
        }
    }

    fn three_source_population(dir: &Path) -> PathBuf {
        let records = vec![
            record(10.0, 5.0, 0.5, 10.0),
            record(120.0, -40.0, 1.5, 20.0),
            record(250.0, 60.0, 0.9, 5.0),
        ];
        let path = dir.join("population.json");
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_end_to_end_serial() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        let mut universe = Universe::new(instrument(), &pop, "Test", dir.path()).unwrap();
        assert_eq!(universe.n_grbs(), 3);
        assert_eq!(universe.queued(), 3);
        assert!(!universe.is_processed());

        universe.go(None).unwrap();
        assert!(universe.is_processed());

        for i in 0..3 {
            assert!(dir.path().join(format!("Test_{}_store.h5", i)).exists());
        }

        let survey_path = dir.path().join("survey.h5");
        universe.save(&survey_path).unwrap();

        let survey = Survey::from_file(&survey_path).unwrap();
        assert_eq!(survey.n_grbs, 3);
        assert_eq!(
            survey.grb_files,
            (0..3)
                .map(|i| dir.path().join(format!("Test_{}_store.h5", i)))
                .collect::<Vec<_>>()
        );
        assert!(survey.population_file.ends_with("population.json"));
    }

    #[test]
    fn test_skip_on_exists() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        // Pretend Test_1 was completed by an earlier, interrupted run
        std::fs::write(dir.path().join("Test_1_store.h5"), "{}").unwrap();

        let mut universe = Universe::new(instrument(), &pop, "Test", dir.path()).unwrap();
        assert_eq!(universe.n_grbs(), 3);
        assert_eq!(universe.queued(), 2);

        universe.go(None).unwrap();

        // The survey still references all three expected stores
        let survey_path = dir.path().join("survey.h5");
        universe.save(&survey_path).unwrap();
        let survey = Survey::from_file(&survey_path).unwrap();
        assert_eq!(survey.n_grbs, 3);
        assert!(survey
            .grb_files
            .contains(&dir.path().join("Test_1_store.h5")));
    }

    #[test]
    fn test_idempotent_resume() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        // First run, interrupted after one job (simulated by running a
        // one-member queue to completion by hand)
        let universe = Universe::new(instrument(), &pop, "Test", dir.path()).unwrap();
        assert_eq!(universe.queued(), 3);
        std::fs::write(dir.path().join("Test_0_store.h5"), "{}").unwrap();
        drop(universe);

        // Resume: only the missing outputs are queued
        let mut resumed = Universe::new(instrument(), &pop, "Test", dir.path()).unwrap();
        assert_eq!(resumed.queued(), 2);

        resumed.go(None).unwrap();
        for i in 0..3 {
            assert!(dir.path().join(format!("Test_{}_store.h5", i)).exists());
        }
    }

    #[test]
    fn test_unfiltered_population_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(10.0, 5.0, 0.5, 10.0),
            SourceRecord {
                ra: 1.0,
                dec: 1.0,
                z: 1.0,
                duration: Some(2.0),
                selected: false,
            },
        ];
        let path = dir.path().join("population.json");
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let err = Universe::new(instrument(), &path, "Test", dir.path())
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            UniverseError::Population(crate::error::PopulationError::Unfiltered { .. })
        ));
    }

    #[test]
    fn test_missing_duration_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![SourceRecord {
            ra: 1.0,
            dec: 1.0,
            z: 1.0,
            duration: None,
            selected: true,
        }];
        let path = dir.path().join("population.json");
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let err = Universe::new(instrument(), &path, "Test", dir.path())
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            UniverseError::Population(crate::error::PopulationError::MissingDuration { .. })
        ));
    }

    #[test]
    fn test_save_before_go_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        let universe = Universe::new(instrument(), &pop, "Test", dir.path()).unwrap();
        let survey_path = dir.path().join("survey.h5");
        universe.save(&survey_path).unwrap();

        assert!(!survey_path.exists());
    }

    #[test]
    fn test_survey_records_absolute_store_paths() {
        // A relative save path must not leak relative paths into the
        // survey artifact.
        let save_dir = PathBuf::from(format!("survey_abs_test_{}", std::process::id()));
        std::fs::create_dir_all(&save_dir).unwrap();

        let records = vec![record(10.0, 5.0, 0.5, 2.0)];
        let pop = save_dir.join("population.json");
        std::fs::write(&pop, serde_json::to_string(&records).unwrap()).unwrap();

        let mut universe = Universe::new(instrument(), &pop, "Abs", &save_dir).unwrap();
        universe.go(None).unwrap();

        let survey_path = save_dir.join("survey.h5");
        universe.save(&survey_path).unwrap();
        let survey = Survey::from_file(&survey_path).unwrap();

        assert!(survey.grb_files.iter().all(|p| p.is_absolute()));
        assert!(survey.population_file.is_absolute());

        std::fs::remove_dir_all(&save_dir).unwrap();
    }

    #[test]
    fn test_serial_failure_aborts_and_blocks_save() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        // Store writes will fail: the save path does not exist
        let missing = dir.path().join("no_such_dir");
        let mut universe = Universe::new(instrument(), &pop, "Fail", &missing).unwrap();
        assert_eq!(universe.queued(), 3);

        let err = universe.go(None).unwrap_err();
        assert!(matches!(err, UniverseError::Job { .. }));
        assert!(!universe.is_processed());

        // save() after a failed batch writes nothing
        let survey_path = dir.path().join("survey.h5");
        universe.save(&survey_path).unwrap();
        assert!(!survey_path.exists());
    }

    #[test]
    fn test_parallel_executor_run() {
        let dir = tempfile::tempdir().unwrap();
        let pop = three_source_population(dir.path());

        let mut universe = Universe::new(instrument(), &pop, "Par", dir.path()).unwrap();
        let executor = RayonExecutor::new().with_threads(2);
        universe.go(Some(&executor)).unwrap();

        assert!(universe.is_processed());
        for i in 0..3 {
            assert!(dir.path().join(format!("Par_{}_store.h5", i)).exists());
        }
    }
}
