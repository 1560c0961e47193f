//! # Gaussmix Core
//!
//! Core types and error taxonomy for the gaussmix mixture-model library.
//!
//! This crate provides:
//! - `MixtureModel`: weights, means and covariances of a Gaussian mixture
//! - `FitResult`: best-restart parameters plus convergence diagnostics
//! - The shared error taxonomy for numerical failures during fitting
//! - The `Algorithm` trait for a consistent execution API

pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{FitResult, MixtureModel, WEIGHT_SUM_TOL};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::model::{FitResult, MixtureModel};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in gaussmix.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
