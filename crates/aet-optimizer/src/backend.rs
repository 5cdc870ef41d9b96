//! Collaborator seams consumed by the search driver, and the composable
//! backend that wires them together for one model family.

use std::marker::PhantomData;

use tracing::debug;

use aet_types::{config_error, validation_error, AetResult, Hyperparameters, ModelFamily};

use crate::trial::BuiltModel;

/// Latent features extracted from one data split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embeddings {
    pub features: Vec<Vec<f64>>,
    /// Binary class labels, one per row.
    pub labels: Vec<u8>,
    /// Example identifiers (e.g. patient ids), one per row.
    pub ids: Vec<String>,
}

impl Embeddings {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Width of the embedding, taken from the first row.
    pub fn dim(&self) -> Option<usize> {
        self.features.first().map(Vec::len)
    }

    /// Rows, labels and ids must line up, and every row must have the same width.
    pub fn check_consistent(&self) -> AetResult<()> {
        if self.labels.len() != self.features.len() || self.ids.len() != self.features.len() {
            return Err(validation_error!(
                "embedding split has {} rows, {} labels and {} ids",
                self.features.len(),
                self.labels.len(),
                self.ids.len()
            ));
        }
        if let Some(dim) = self.dim() {
            if self.features.iter().any(|row| row.len() != dim) {
                return Err(validation_error!("embedding rows differ in width"));
            }
        }
        Ok(())
    }
}

/// Downstream classifier fit on train embeddings and scored on validation.
#[derive(Debug, Clone)]
pub struct Evaluation<C> {
    pub classifier: C,
    pub roc_auc: f64,
    pub predictions: Vec<f64>,
}

/// Architecture-relevant fields of one configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchitectureParams {
    pub latent_dim: usize,
    pub dropout_rate: f64,
    pub input_dim: usize,
}

/// Training-relevant fields of one configuration. The full configuration is
/// passed through for family-specific loss weights.
#[derive(Debug, Clone, Copy)]
pub struct TrainingParams<'a> {
    pub epochs: usize,
    pub learning_rate: f64,
    pub hyperparams: &'a Hyperparameters,
}

pub trait ModelFactory {
    type Model;

    fn create(&self, params: &ArchitectureParams) -> AetResult<BuiltModel<Self::Model>>;
}

/// Trains a freshly built model from scratch.
pub trait Trainer<M, L: ?Sized> {
    fn train(&self, model: M, loader: &L, params: &TrainingParams<'_>) -> AetResult<M>;
}

pub trait FeatureExtractor<M, L: ?Sized> {
    fn extract(&self, model: &M, loader: &L) -> AetResult<Embeddings>;
}

pub trait Scorer {
    type Classifier;

    fn evaluate(&self, train: &Embeddings, val: &Embeddings)
        -> AetResult<Evaluation<Self::Classifier>>;
}

/// Validation loss of a trained model (reconstruction plus any family-specific
/// regularization term), used by blended scoring.
pub trait LossProbe<M, L: ?Sized> {
    fn validation_loss(&self, model: &M, loader: &L) -> AetResult<f64>;
}

/// The capability set the search driver needs from a model family.
pub trait FamilyBackend {
    type Model;
    type Loader: ?Sized;

    fn family(&self) -> ModelFamily;

    fn build(&self, params: &Hyperparameters) -> AetResult<BuiltModel<Self::Model>>;

    fn train(
        &self,
        model: Self::Model,
        loader: &Self::Loader,
        epochs: usize,
        params: &Hyperparameters,
    ) -> AetResult<Self::Model>;

    /// Validation score of a trained model; higher is better.
    fn score(
        &self,
        model: &Self::Model,
        train: &Self::Loader,
        val: &Self::Loader,
    ) -> AetResult<f64>;
}

/// Names of the configuration keys a [`ProbeBackend`] reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub latent_dim: String,
    pub dropout_rate: String,
    pub learning_rate: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            latent_dim: "latent_dim".to_string(),
            dropout_rate: "dropout_rate".to_string(),
            learning_rate: "lr".to_string(),
        }
    }
}

/// How a [`ProbeBackend`] turns an evaluation into a search score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreRule {
    /// Validation ROC-AUC of the latent-feature probe.
    RocAuc,
    /// ROC-AUC minus `loss_weight` times the model's validation loss.
    Blended { loss_weight: f64 },
}

/// Backend that builds a model from a factory, trains it, and scores it by
/// fitting a classifier on its latent features.
pub struct ProbeBackend<F, T, X, S, L>
where
    F: ModelFactory,
    L: ?Sized,
{
    family: ModelFamily,
    input_dim: usize,
    fields: FieldNames,
    factory: F,
    trainer: T,
    extractor: X,
    scorer: S,
    loss_probe: Option<(f64, Box<dyn LossProbe<F::Model, L>>)>,
    _loader: PhantomData<fn(&L)>,
}

impl<F, T, X, S, L> ProbeBackend<F, T, X, S, L>
where
    F: ModelFactory,
    T: Trainer<F::Model, L>,
    X: FeatureExtractor<F::Model, L>,
    S: Scorer,
    L: ?Sized,
{
    pub fn new(
        family: ModelFamily,
        input_dim: usize,
        factory: F,
        trainer: T,
        extractor: X,
        scorer: S,
    ) -> Self {
        Self {
            family,
            input_dim,
            fields: FieldNames::default(),
            factory,
            trainer,
            extractor,
            scorer,
            loss_probe: None,
            _loader: PhantomData,
        }
    }

    pub fn with_fields(mut self, fields: FieldNames) -> Self {
        self.fields = fields;
        self
    }

    /// Switch to [`ScoreRule::Blended`], penalizing the probe's validation loss.
    pub fn with_blended_score<P>(mut self, loss_weight: f64, probe: P) -> AetResult<Self>
    where
        P: LossProbe<F::Model, L> + 'static,
    {
        if !loss_weight.is_finite() || loss_weight < 0.0 {
            return Err(config_error!(
                "loss weight must be a non-negative number, got {}",
                loss_weight
            ));
        }
        self.loss_probe = Some((loss_weight, Box::new(probe)));
        Ok(self)
    }

    pub fn score_rule(&self) -> ScoreRule {
        match &self.loss_probe {
            Some((loss_weight, _)) => ScoreRule::Blended {
                loss_weight: *loss_weight,
            },
            None => ScoreRule::RocAuc,
        }
    }

    pub fn architecture_params(&self, params: &Hyperparameters) -> AetResult<ArchitectureParams> {
        let latent_dim = params.get_usize(&self.fields.latent_dim)?;
        let dropout_rate = params.get_float(&self.fields.dropout_rate)?;
        if latent_dim == 0 {
            return Err(validation_error!("{} must be positive", self.fields.latent_dim));
        }
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(validation_error!(
                "{} must be in [0, 1), got {}",
                self.fields.dropout_rate,
                dropout_rate
            ));
        }
        Ok(ArchitectureParams {
            latent_dim,
            dropout_rate,
            input_dim: self.input_dim,
        })
    }
}

impl<F, T, X, S, L> FamilyBackend for ProbeBackend<F, T, X, S, L>
where
    F: ModelFactory,
    T: Trainer<F::Model, L>,
    X: FeatureExtractor<F::Model, L>,
    S: Scorer,
    L: ?Sized,
{
    type Model = F::Model;
    type Loader = L;

    fn family(&self) -> ModelFamily {
        self.family
    }

    fn build(&self, params: &Hyperparameters) -> AetResult<BuiltModel<F::Model>> {
        let arch = self.architecture_params(params)?;
        self.factory.create(&arch)
    }

    fn train(
        &self,
        model: F::Model,
        loader: &L,
        epochs: usize,
        params: &Hyperparameters,
    ) -> AetResult<F::Model> {
        let learning_rate = params.get_float(&self.fields.learning_rate)?;
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(validation_error!(
                "{} must be positive, got {}",
                self.fields.learning_rate,
                learning_rate
            ));
        }
        self.trainer.train(
            model,
            loader,
            &TrainingParams {
                epochs,
                learning_rate,
                hyperparams: params,
            },
        )
    }

    fn score(&self, model: &F::Model, train: &L, val: &L) -> AetResult<f64> {
        let train_emb = self.extractor.extract(model, train)?;
        let val_emb = self.extractor.extract(model, val)?;
        train_emb.check_consistent()?;
        val_emb.check_consistent()?;

        let evaluation = self.scorer.evaluate(&train_emb, &val_emb)?;
        debug!(
            "Probe ROC-AUC {:.4} over {} validation rows",
            evaluation.roc_auc,
            evaluation.predictions.len()
        );

        match &self.loss_probe {
            None => Ok(evaluation.roc_auc),
            Some((loss_weight, probe)) => {
                let loss = probe.validation_loss(model, val)?;
                debug!("Validation loss {:.4} (weight {})", loss, loss_weight);
                Ok(evaluation.roc_auc - loss_weight * loss)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the driver and backend tests.

    use super::*;
    use aet_types::{internal_error, ArchitectureDescriptor};
    use std::cell::{Cell, RefCell};

    /// Model stand-in recording what it was built and trained with.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FakeModel {
        pub arch: ArchitectureParams,
        pub trained_epochs: usize,
        pub learning_rate: f64,
    }

    pub struct FakeFactory;

    impl ModelFactory for FakeFactory {
        type Model = FakeModel;

        fn create(&self, params: &ArchitectureParams) -> AetResult<BuiltModel<FakeModel>> {
            Ok(BuiltModel::new(
                FakeModel {
                    arch: *params,
                    trained_epochs: 0,
                    learning_rate: 0.0,
                },
                ArchitectureDescriptor::new("FakeAutoencoder")
                    .with_input_dim(params.input_dim)
                    .with_latent_dim(params.latent_dim),
            ))
        }
    }

    /// Loader stand-in; the tests only need a handle.
    pub struct Split(pub &'static str);

    #[derive(Default)]
    pub struct CountingTrainer {
        pub calls: Cell<usize>,
    }

    impl Trainer<FakeModel, Split> for CountingTrainer {
        fn train(
            &self,
            mut model: FakeModel,
            _loader: &Split,
            params: &TrainingParams<'_>,
        ) -> AetResult<FakeModel> {
            self.calls.set(self.calls.get() + 1);
            model.trained_epochs = params.epochs;
            model.learning_rate = params.learning_rate;
            Ok(model)
        }
    }

    /// Emits one row per split whose single feature is the latent width.
    pub struct WidthExtractor;

    impl FeatureExtractor<FakeModel, Split> for WidthExtractor {
        fn extract(&self, model: &FakeModel, loader: &Split) -> AetResult<Embeddings> {
            Ok(Embeddings {
                features: vec![vec![model.arch.latent_dim as f64]],
                labels: vec![1],
                ids: vec![loader.0.to_string()],
            })
        }
    }

    /// Replays a fixed score sequence; `None` entries fail.
    pub struct ScriptedScorer {
        script: RefCell<std::vec::IntoIter<Option<f64>>>,
    }

    impl ScriptedScorer {
        pub fn new(scores: Vec<Option<f64>>) -> Self {
            Self {
                script: RefCell::new(scores.into_iter()),
            }
        }
    }

    impl Scorer for ScriptedScorer {
        type Classifier = ();

        fn evaluate(&self, _train: &Embeddings, val: &Embeddings) -> AetResult<Evaluation<()>> {
            match self.script.borrow_mut().next() {
                Some(Some(roc_auc)) => Ok(Evaluation {
                    classifier: (),
                    roc_auc,
                    predictions: vec![roc_auc; val.len()],
                }),
                Some(None) => Err(internal_error!("logistic regression failed to converge")),
                None => Err(internal_error!("score script exhausted")),
            }
        }
    }

    pub type FakeBackend =
        ProbeBackend<FakeFactory, CountingTrainer, WidthExtractor, ScriptedScorer, Split>;

    impl FakeBackend {
        pub fn trainer_calls(&self) -> usize {
            self.trainer.calls.get()
        }
    }

    pub fn backend(family: ModelFamily, scores: Vec<Option<f64>>) -> FakeBackend {
        ProbeBackend::new(
            family,
            128,
            FakeFactory,
            CountingTrainer::default(),
            WidthExtractor,
            ScriptedScorer::new(scores),
        )
    }
}
