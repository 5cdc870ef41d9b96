use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AetError;

/// Model families that can be tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Reconstruction-only autoencoder.
    UnsupervisedAe,
    /// Autoencoder with a classification head on the latent code.
    SemisupervisedAe,
    /// Regularized variational autoencoder with a classification head.
    SemisupervisedRvae,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::UnsupervisedAe,
        ModelFamily::SemisupervisedAe,
        ModelFamily::SemisupervisedRvae,
    ];

    /// Tag used in artifact file names and the `model_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupervisedAe => "unsupervised_ae",
            Self::SemisupervisedAe => "semisupervised_ae",
            Self::SemisupervisedRvae => "semisupervised_rvae",
        }
    }

    /// Banner shown when a search over this family starts.
    pub fn title(&self) -> &'static str {
        match self {
            Self::UnsupervisedAe => "UNSUPERVISED VANILLA AUTOENCODER WITH L1 REGULARIZATION",
            Self::SemisupervisedAe => "SEMI-SUPERVISED AUTOENCODER",
            Self::SemisupervisedRvae => "SEMI-SUPERVISED REGULARIZED VARIATIONAL AUTOENCODER",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = AetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| AetError::Validation(format!("Unknown model family: {s}")))
    }
}
