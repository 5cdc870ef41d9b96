//! Default search grids per model family.

use aet_types::ModelFamily;

use crate::search::SearchSpace;

/// The grid searched for a family when no space is supplied.
///
/// All families share the architecture and learning-rate axes. The
/// semi-supervised families add `alpha`, the weight of the classification
/// loss, and the RVAE adds `beta`, the weight of its KL regularizer.
pub fn default_search_space(family: ModelFamily) -> SearchSpace {
    let base = SearchSpace::new()
        .add_ints("latent_dim", &[16, 32, 64])
        .add_floats("dropout_rate", &[0.1, 0.3])
        .add_floats("lr", &[1e-3, 1e-4]);

    match family {
        ModelFamily::UnsupervisedAe => base,
        ModelFamily::SemisupervisedAe => base.add_floats("alpha", &[0.5, 1.0]),
        ModelFamily::SemisupervisedRvae => base
            .add_floats("alpha", &[0.5, 1.0])
            .add_floats("beta", &[0.1, 1.0]),
    }
}
