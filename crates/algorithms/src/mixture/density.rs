//! Multivariate normal density evaluation
//!
//! Each component covariance is factored once per E-step as `Sigma = L L^T`
//! (Cholesky). The factor gives the log-determinant from the diagonal of `L`
//! and the squared Mahalanobis distance by forward substitution, so the
//! log-density never forms an explicit matrix inverse.

use gaussmix_core::{Error, Result};
use ndarray::{Array2, ArrayView1};

/// Pivot threshold below which a covariance is treated as singular.
/// Covariances leaving the M-step carry at least `reg_covar` on the
/// diagonal, so a pivot this small means genuine collapse.
const MIN_PIVOT: f64 = 1e-12;

/// Lower-triangular Cholesky factor of one component's covariance matrix.
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    lower: Array2<f64>,
    log_det: f64,
}

impl CholeskyFactor {
    /// Factor a symmetric matrix, failing with
    /// [`Error::SingularCovariance`] if it is not numerically
    /// positive-definite. `component` only labels the error.
    pub fn new(cov: &Array2<f64>, component: usize) -> Result<Self> {
        let d = cov.nrows();
        let mut lower = Array2::<f64>::zeros((d, d));
        let mut log_det = 0.0;

        for i in 0..d {
            for j in 0..=i {
                let mut sum = cov[[i, j]];
                for t in 0..j {
                    sum -= lower[[i, t]] * lower[[j, t]];
                }
                if i == j {
                    if !sum.is_finite() || sum < MIN_PIVOT {
                        return Err(Error::SingularCovariance { component });
                    }
                    let pivot = sum.sqrt();
                    lower[[i, i]] = pivot;
                    log_det += 2.0 * pivot.ln();
                } else {
                    lower[[i, j]] = sum / lower[[j, j]];
                }
            }
        }

        Ok(Self { lower, log_det })
    }

    /// Log-determinant of the factored covariance
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Squared Mahalanobis distance `(x - mean)^T Sigma^-1 (x - mean)`.
    ///
    /// Solves `L z = x - mean` by forward substitution; the distance is
    /// `|z|^2`.
    pub fn mahalanobis_sq(&self, x: ArrayView1<'_, f64>, mean: ArrayView1<'_, f64>) -> f64 {
        let d = self.lower.nrows();
        let mut z = vec![0.0_f64; d];
        for i in 0..d {
            let mut sum = x[i] - mean[i];
            for t in 0..i {
                sum -= self.lower[[i, t]] * z[t];
            }
            z[i] = sum / self.lower[[i, i]];
        }
        z.iter().map(|v| v * v).sum()
    }

    /// `ln N(x; mean, Sigma)` for the factored covariance.
    pub fn log_density(&self, x: ArrayView1<'_, f64>, mean: ArrayView1<'_, f64>) -> f64 {
        let d = self.lower.nrows() as f64;
        let log_2pi = (2.0 * std::f64::consts::PI).ln();
        -0.5 * (d * log_2pi + self.log_det() + self.mahalanobis_sq(x, mean))
    }
}
