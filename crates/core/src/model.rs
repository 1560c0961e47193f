//! Mixture model types

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};

/// Tolerance used when checking that probability vectors sum to one.
pub const WEIGHT_SUM_TOL: f64 = 1e-6;

/// A fitted (or in-progress) mixture of multivariate Gaussians.
///
/// The model holds `k` components over points of dimension `d`:
/// mixing `weights` (length `k`, non-negative, summing to 1), component
/// `means` (shape `(k, d)`) and one symmetric positive-definite `d x d`
/// covariance matrix per component.
#[derive(Debug, Clone)]
pub struct MixtureModel {
    /// Mixing proportions, length `k`
    pub weights: Array1<f64>,
    /// Component means, shape `(k, d)`
    pub means: Array2<f64>,
    /// Component covariance matrices, each `d x d`
    pub covariances: Vec<Array2<f64>>,
}

impl MixtureModel {
    /// Create a model from its parts, checking shape consistency.
    pub fn new(
        weights: Array1<f64>,
        means: Array2<f64>,
        covariances: Vec<Array2<f64>>,
    ) -> Result<Self> {
        let k = weights.len();
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "weights",
                value: "[]".into(),
                reason: "mixture needs at least one component".into(),
            });
        }
        if means.nrows() != k || covariances.len() != k {
            return Err(Error::InvalidParameter {
                name: "means",
                value: format!("{} rows, {} covariances", means.nrows(), covariances.len()),
                reason: format!("expected one mean and covariance per component ({k})"),
            });
        }
        let d = means.ncols();
        for (c, cov) in covariances.iter().enumerate() {
            if cov.nrows() != d || cov.ncols() != d {
                return Err(Error::InvalidParameter {
                    name: "covariances",
                    value: format!("{}x{}", cov.nrows(), cov.ncols()),
                    reason: format!("covariance of component {c} must be {d}x{d}"),
                });
            }
        }
        Ok(Self {
            weights,
            means,
            covariances,
        })
    }

    /// Number of mixture components
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    /// Dimensionality of the points the model describes
    pub fn dim(&self) -> usize {
        self.means.ncols()
    }

    /// Verify the probabilistic invariants: finite parameters and weights
    /// summing to 1 within [`WEIGHT_SUM_TOL`].
    ///
    /// Positive-definiteness of the covariances is not checked here; it is
    /// established by the Cholesky factorization at density-evaluation time.
    pub fn check_invariants(&self) -> Result<()> {
        let sum: f64 = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(Error::Other(format!(
                "mixture weights sum to {sum}, expected 1"
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Other("mixture weights must be finite and non-negative".into()));
        }
        if self.means.iter().any(|m| !m.is_finite()) {
            return Err(Error::Other("mixture means contain non-finite values".into()));
        }
        for (c, cov) in self.covariances.iter().enumerate() {
            if cov.iter().any(|v| !v.is_finite()) {
                return Err(Error::DegenerateComponent { component: c });
            }
        }
        Ok(())
    }
}

/// Outcome of a full multi-restart EM fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Parameters of the best restart (highest lower bound)
    pub model: MixtureModel,
    /// Final variational lower bound of the best restart
    pub lower_bound: f64,
    /// Responsibilities of the best restart, shape `(n, k)`; rows sum to 1
    pub responsibilities: Array2<f64>,
    /// Whether the best restart met the relative tolerance before the
    /// iteration budget ran out. When `false` the parameters are still the
    /// best available, just not fully converged.
    pub converged: bool,
    /// EM iterations performed by the best restart
    pub n_iter: usize,
    /// Restarts abandoned due to singular or degenerate components
    pub failed_restarts: usize,
}

impl FitResult {
    /// Hard cluster assignment: argmax of each responsibility row.
    pub fn labels(&self) -> Vec<usize> {
        self.responsibilities
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                let mut best_val = f64::NEG_INFINITY;
                for (c, &v) in row.iter().enumerate() {
                    if v > best_val {
                        best_val = v;
                        best = c;
                    }
                }
                best
            })
            .collect()
    }
}
