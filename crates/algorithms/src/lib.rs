//! # Gaussmix Algorithms
//!
//! Gaussian mixture model fitting for the gaussmix library.
//!
//! The engine estimates the density of an unlabeled dataset as a mixture of
//! multivariate Gaussians, fit by expectation-maximization with independent
//! random restarts and a variational-lower-bound stopping rule. Soft cluster
//! membership comes back as a responsibility matrix; hard labels are its
//! per-row argmax.
//!
//! ```ignore
//! use gaussmix_algorithms::mixture::{fit_mixture, GmmParams};
//!
//! let params = GmmParams { n_components: 3, ..Default::default() };
//! let result = fit_mixture(&data, &params)?;
//! println!("weights: {:?}", result.model.weights);
//! let labels = result.labels();
//! ```
//!
//! Restarts run in parallel when the default `parallel` feature is enabled;
//! results are identical with the feature disabled.

mod maybe_rayon;
pub mod mixture;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::mixture::{
        fit_mixture, predict, predict_proba, score_samples, GaussianMixture, GmmParams,
        MixtureInit,
    };
    pub use gaussmix_core::prelude::*;
}
