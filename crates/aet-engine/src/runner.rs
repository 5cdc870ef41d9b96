use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use aet_data::ArtifactStore;
use aet_optimizer::{default_search_space, FamilyBackend, GridSearchDriver, SearchSpace};
use aet_types::{AetResult, Checkpoint, Hyperparameters, ModelFamily, TuningConfig};

/// What one family's search produced and where it was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub family: ModelFamily,
    pub best_config: Hyperparameters,
    pub best_score: f64,
    pub configurations: usize,
    pub failed: usize,
    pub results_path: PathBuf,
    pub model_path: PathBuf,
    pub descriptor_path: PathBuf,
}

/// Runs a search for one family and writes its artifacts.
#[derive(Debug, Clone)]
pub struct TuningRunner {
    config: TuningConfig,
    driver: GridSearchDriver,
    store: ArtifactStore,
}

impl TuningRunner {
    pub fn new(config: TuningConfig) -> AetResult<Self> {
        config.validate()?;
        let store = ArtifactStore::from_config(&config)?;
        let driver = GridSearchDriver::from_config(&config);

        Ok(Self {
            config,
            driver,
            store,
        })
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Search `space` (or the family's default grid), then save the result
    /// list and the best model.
    pub fn run_family<B>(
        &self,
        backend: &B,
        train: &B::Loader,
        val: &B::Loader,
        space: Option<&SearchSpace>,
    ) -> AetResult<RunReport>
    where
        B: FamilyBackend,
        B::Model: Checkpoint,
    {
        let family = backend.family();
        let space = space
            .cloned()
            .unwrap_or_else(|| default_search_space(family));

        let outcome = self.driver.search(backend, train, val, &space)?;
        info!(
            "{} search finished in {}s ({} configurations, {} failed)",
            family,
            outcome.elapsed_seconds(),
            outcome.results.len(),
            outcome.failed_count()
        );

        let results_path =
            self.store
                .save_search_results(&outcome.results, family, &outcome.search_space)?;
        let (model_path, descriptor_path) = self.store.save_best_model(
            &outcome.best_model,
            &outcome.best_config,
            outcome.best_score,
            family,
            &outcome.best_architecture,
        )?;

        Ok(RunReport {
            run_id: outcome.id,
            family,
            configurations: outcome.results.len(),
            failed: outcome.failed_count(),
            best_config: outcome.best_config,
            best_score: outcome.best_score,
            results_path,
            model_path,
            descriptor_path,
        })
    }
}

/// One family queued in a [`TuningSession`].
pub trait FamilyJob<L: ?Sized> {
    fn family(&self) -> ModelFamily;

    fn run(&self, runner: &TuningRunner, train: &L, val: &L) -> AetResult<RunReport>;
}

struct BackendJob<B> {
    backend: B,
    space: Option<SearchSpace>,
}

impl<B> FamilyJob<B::Loader> for BackendJob<B>
where
    B: FamilyBackend,
    B::Model: Checkpoint,
{
    fn family(&self) -> ModelFamily {
        self.backend.family()
    }

    fn run(&self, runner: &TuningRunner, train: &B::Loader, val: &B::Loader) -> AetResult<RunReport> {
        runner.run_family(&self.backend, train, val, self.space.as_ref())
    }
}

/// Several families tuned one after another on the same data splits.
pub struct TuningSession<'a, L: ?Sized> {
    runner: TuningRunner,
    jobs: Vec<Box<dyn FamilyJob<L> + 'a>>,
}

impl<'a, L: ?Sized> TuningSession<'a, L> {
    pub fn new(runner: TuningRunner) -> Self {
        Self {
            runner,
            jobs: Vec::new(),
        }
    }

    /// Queue a family; `None` searches its default grid.
    pub fn add<B>(mut self, backend: B, space: Option<SearchSpace>) -> Self
    where
        B: FamilyBackend<Loader = L> + 'a,
        B::Model: Checkpoint,
    {
        self.jobs.push(Box::new(BackendJob { backend, space }));
        self
    }

    pub fn families(&self) -> Vec<ModelFamily> {
        self.jobs.iter().map(|job| job.family()).collect()
    }

    pub fn runner(&self) -> &TuningRunner {
        &self.runner
    }

    /// Run every queued family in order. The first failing family stops the
    /// session.
    pub fn run_all(&self, train: &L, val: &L) -> AetResult<Vec<RunReport>> {
        info!("Tuning {} model families", self.jobs.len());
        self.jobs
            .iter()
            .map(|job| job.run(&self.runner, train, val))
            .collect()
    }
}
