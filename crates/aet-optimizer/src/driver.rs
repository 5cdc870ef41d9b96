//! Sequential exhaustive grid search over one model family.

use chrono::Utc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use aet_types::{AetResult, FailurePolicy, Hyperparameters, SearchError, TuningConfig};

use crate::backend::FamilyBackend;
use crate::search::{GridSearch, SearchSpace};
use crate::trial::{BestState, BuiltModel, SearchOutcome, SearchResult};

/// Drives build → train → score for every configuration of a search space and
/// keeps the best one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSearchDriver {
    epochs: usize,
    failure_policy: FailurePolicy,
}

impl GridSearchDriver {
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            failure_policy: FailurePolicy::Abort,
        }
    }

    pub fn from_config(config: &TuningConfig) -> Self {
        Self::new(config.epochs).with_failure_policy(config.failure_policy)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Evaluate every configuration in `space` and return the best model,
    /// its configuration and score, and one result per configuration in
    /// enumeration order.
    ///
    /// The space and epoch count are validated before anything is trained.
    pub fn search<B: FamilyBackend>(
        &self,
        backend: &B,
        train: &B::Loader,
        val: &B::Loader,
        space: &SearchSpace,
    ) -> AetResult<SearchOutcome<B::Model>> {
        if self.epochs == 0 {
            return Err(SearchError::InvalidEpochs { epochs: 0 }.into());
        }
        let grid = GridSearch::new(space.clone())?;
        let total = grid.total();

        let family = backend.family();
        let id = Uuid::new_v4();
        let span = info_span!("search", family = %family, run_id = %id);
        let _guard = span.enter();

        info!("Hyperparameter search: {}", family.title());
        info!("Num configurations: {}", total);

        let started_at = Utc::now();
        let mut best: BestState<BuiltModel<B::Model>> = BestState::new();
        let mut results = Vec::with_capacity(total);

        for (i, hyperparams) in grid.enumerate() {
            info!("Configuration {}/{}: {}", i + 1, total, hyperparams.display());

            match self.evaluate(backend, train, val, &hyperparams) {
                Ok((built, score)) => {
                    if best.offer(score, &hyperparams, built) {
                        info!("[{}/{}] New best: {:.4}", i + 1, total, score);
                    } else {
                        info!("[{}/{}] Score: {:.4}", i + 1, total, score);
                    }
                    results.push(SearchResult::scored(hyperparams, score));
                }
                Err(e) => match self.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(SearchError::TrialFailed {
                            index: i + 1,
                            total,
                            source: Box::new(e),
                        }
                        .into());
                    }
                    FailurePolicy::Skip => {
                        warn!("Configuration {}/{} failed, skipping: {}", i + 1, total, e);
                        results.push(SearchResult::failed(hyperparams, e.to_string()));
                    }
                },
            }
        }

        let Some((built, best_config, best_score)) = best.into_parts() else {
            // NaN scores never win, so configurations can all complete without a best
            let error = if results.iter().any(SearchResult::is_success) {
                SearchError::NoFiniteScore { total }
            } else {
                SearchError::NoSuccessfulTrials { total }
            };
            return Err(error.into());
        };

        info!("Best hyperparameters: {}", best_config.display());
        info!("Validation ROC-AUC: {:.3}", best_score);

        Ok(SearchOutcome {
            id,
            family,
            search_space: space.clone(),
            best_model: built.model,
            best_architecture: built.architecture,
            best_config,
            best_score,
            results,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Build a fresh model, train it from scratch and score it.
    fn evaluate<B: FamilyBackend>(
        &self,
        backend: &B,
        train: &B::Loader,
        val: &B::Loader,
        hyperparams: &Hyperparameters,
    ) -> AetResult<(BuiltModel<B::Model>, f64)> {
        let BuiltModel {
            model,
            architecture,
        } = backend.build(hyperparams)?;
        let model = backend.train(model, train, self.epochs, hyperparams)?;
        let score = backend.score(&model, train, val)?;
        Ok((BuiltModel::new(model, architecture), score))
    }
}
