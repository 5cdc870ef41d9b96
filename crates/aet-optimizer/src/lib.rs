//! # aet-optimizer
//!
//! Exhaustive hyperparameter search for autoencoder families.
//!
//! Provides search space definitions, grid enumeration, best-result tracking,
//! the collaborator traits a model family plugs in through, and the generic
//! driver that runs build → train → score for every configuration.

mod backend;
mod driver;
mod presets;
mod search;
mod trial;

pub use backend::{
    ArchitectureParams, Embeddings, Evaluation, FamilyBackend, FeatureExtractor, FieldNames,
    LossProbe, ModelFactory, ProbeBackend, ScoreRule, Scorer, Trainer, TrainingParams,
};
pub use driver::GridSearchDriver;
pub use presets::default_search_space;
pub use search::{GridSearch, ParameterDef, SearchSpace};
pub use trial::{BestState, BuiltModel, SearchId, SearchOutcome, SearchResult};
