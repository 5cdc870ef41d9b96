//! Per-configuration results and best-so-far tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aet_types::{ArchitectureDescriptor, Hyperparameters, ModelFamily};

use crate::search::SearchSpace;

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Outcome of evaluating one configuration.
///
/// A configuration that failed under the skip policy keeps its slot with no
/// score and the error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hyperparams: Hyperparameters,
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    pub fn scored(hyperparams: Hyperparameters, score: f64) -> Self {
        Self {
            hyperparams,
            score: Some(score),
            error: None,
        }
    }

    pub fn failed(hyperparams: Hyperparameters, error: String) -> Self {
        Self {
            hyperparams,
            score: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.score.is_some()
    }
}

/// A freshly constructed model and the shape metadata its factory reported.
#[derive(Debug, Clone)]
pub struct BuiltModel<M> {
    pub model: M,
    pub architecture: ArchitectureDescriptor,
}

impl<M> BuiltModel<M> {
    pub fn new(model: M, architecture: ArchitectureDescriptor) -> Self {
        Self {
            model,
            architecture,
        }
    }
}

#[derive(Debug)]
struct Incumbent<M> {
    model: M,
    config: Hyperparameters,
    score: f64,
}

/// The best configuration seen so far and the model it produced.
///
/// Starts empty at a score of negative infinity. Only a strictly higher score
/// replaces the incumbent, so the earliest configuration reaching a maximum
/// keeps it. NaN scores never win.
#[derive(Debug)]
pub struct BestState<M> {
    incumbent: Option<Incumbent<M>>,
}

impl<M> Default for BestState<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> BestState<M> {
    pub fn new() -> Self {
        Self { incumbent: None }
    }

    pub fn score(&self) -> f64 {
        self.incumbent
            .as_ref()
            .map_or(f64::NEG_INFINITY, |best| best.score)
    }

    pub fn config(&self) -> Option<&Hyperparameters> {
        self.incumbent.as_ref().map(|best| &best.config)
    }

    /// Offer a candidate; returns whether it became the new best.
    pub fn offer(&mut self, score: f64, config: &Hyperparameters, model: M) -> bool {
        if score > self.score() {
            self.incumbent = Some(Incumbent {
                model,
                config: config.clone(),
                score,
            });
            true
        } else {
            false
        }
    }

    pub fn into_parts(self) -> Option<(M, Hyperparameters, f64)> {
        self.incumbent
            .map(|best| (best.model, best.config, best.score))
    }
}

/// Everything a finished search returns.
#[derive(Debug)]
pub struct SearchOutcome<M> {
    pub id: SearchId,
    pub family: ModelFamily,
    pub search_space: SearchSpace,
    pub best_model: M,
    pub best_architecture: ArchitectureDescriptor,
    pub best_config: Hyperparameters,
    pub best_score: f64,
    /// One entry per configuration, in enumeration order.
    pub results: Vec<SearchResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<M> SearchOutcome<M> {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn elapsed_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
