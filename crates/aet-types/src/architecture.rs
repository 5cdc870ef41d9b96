//! Model shape metadata and the checkpoint seam for trained weights.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::errors::AetResult;

/// Shape metadata reported by a model factory alongside the model it builds.
///
/// Fields the factory cannot determine stay `None` and are written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArchitectureDescriptor {
    pub input_dim: Option<usize>,
    pub latent_dim: Option<usize>,
    pub model_class: String,
}

impl ArchitectureDescriptor {
    pub fn new(model_class: impl Into<String>) -> Self {
        Self {
            input_dim: None,
            latent_dim: None,
            model_class: model_class.into(),
        }
    }

    pub fn with_input_dim(mut self, input_dim: usize) -> Self {
        self.input_dim = Some(input_dim);
        self
    }

    pub fn with_latent_dim(mut self, latent_dim: usize) -> Self {
        self.latent_dim = Some(latent_dim);
        self
    }
}

/// A trained model whose learnable parameters can be written out as an
/// opaque blob.
pub trait Checkpoint {
    fn write_parameters(&self, writer: &mut dyn Write) -> AetResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_serialize_as_null() {
        let arch = ArchitectureDescriptor::new("UnsupervisedAutoencoder").with_latent_dim(16);
        let value = serde_json::to_value(&arch).unwrap();
        assert_eq!(value["input_dim"], serde_json::Value::Null);
        assert_eq!(value["latent_dim"], 16);
        assert_eq!(value["model_class"], "UnsupervisedAutoencoder");
    }
}
