//! The two half-steps of expectation-maximization and the variational
//! lower bound used for convergence checks and restart ranking.
//!
//! All three operations are pure functions of the dataset and the current
//! parameters; the restart controller in [`super::fit_mixture`] owns the
//! iteration order (E-step, then M-step, then score).

use gaussmix_core::{Error, MixtureModel, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use super::density::CholeskyFactor;

/// Responsibility mass below which a component counts as dead.
const MIN_COMPONENT_MASS: f64 = 1e-8;

/// Posterior quantities produced by one E-step.
#[derive(Debug, Clone)]
pub struct EStep {
    /// Responsibilities, shape `(n, k)`; every row sums to 1
    pub responsibilities: Array2<f64>,
    /// `ln(weight_c) + ln N(x_i; mean_c, cov_c)`, shape `(n, k)`
    pub log_joint: Array2<f64>,
    /// Per-point log-sum-exp of `log_joint` rows (the log-likelihood of
    /// each point under the mixture), length `n`
    pub log_norm: Array1<f64>,
}

/// Expectation step: soft-assign every point to every component.
///
/// Computed entirely in log space so that components whose densities differ
/// by hundreds of orders of magnitude still normalize cleanly. Covariances
/// are factored once per call; a factorization failure surfaces as
/// [`Error::SingularCovariance`] for the restart controller to catch.
pub fn e_step(data: &Array2<f64>, model: &MixtureModel) -> Result<EStep> {
    let n = data.nrows();
    let k = model.n_components();

    let factors: Vec<CholeskyFactor> = model
        .covariances
        .iter()
        .enumerate()
        .map(|(c, cov)| CholeskyFactor::new(cov, c))
        .collect::<Result<_>>()?;

    let log_weights: Vec<f64> = model.weights.iter().map(|w| w.ln()).collect();

    let mut log_joint = Array2::<f64>::zeros((n, k));
    let mut log_norm = Array1::<f64>::zeros(n);
    let mut responsibilities = Array2::<f64>::zeros((n, k));

    for i in 0..n {
        let x = data.row(i);
        let mut row_max = f64::NEG_INFINITY;
        for c in 0..k {
            let lj = log_weights[c] + factors[c].log_density(x, model.means.row(c));
            log_joint[[i, c]] = lj;
            if lj > row_max {
                row_max = lj;
            }
        }

        // log-sum-exp with the row maximum shifted out
        let sum_exp: f64 = (0..k).map(|c| (log_joint[[i, c]] - row_max).exp()).sum();
        let lse = row_max + sum_exp.ln();
        if !lse.is_finite() {
            return Err(Error::Other(format!(
                "point {i} has zero density under every component"
            )));
        }
        log_norm[i] = lse;

        for c in 0..k {
            responsibilities[[i, c]] = (log_joint[[i, c]] - lse).exp();
        }
    }

    Ok(EStep {
        responsibilities,
        log_joint,
        log_norm,
    })
}

/// Maximization step: re-estimate weights, means and covariances from the
/// current responsibilities.
///
/// `reg_covar` is added to every covariance diagonal to keep the matrices
/// positive-definite when a component tightens around few points. A
/// component whose responsibility mass collapses, or whose update produces
/// non-finite values, raises [`Error::DegenerateComponent`].
pub fn m_step(data: &Array2<f64>, resp: &Array2<f64>, reg_covar: f64) -> Result<MixtureModel> {
    let (n, d) = data.dim();
    let k = resp.ncols();

    // Per-component responsibility mass
    let mut nk = vec![0.0_f64; k];
    for i in 0..n {
        for c in 0..k {
            nk[c] += resp[[i, c]];
        }
    }
    for (c, &mass) in nk.iter().enumerate() {
        if !mass.is_finite() || mass < MIN_COMPONENT_MASS {
            return Err(Error::DegenerateComponent { component: c });
        }
    }

    let weights = Array1::from_iter(nk.iter().map(|&mass| mass / n as f64));

    // Weighted means
    let mut means = Array2::<f64>::zeros((k, d));
    for i in 0..n {
        for c in 0..k {
            let r = resp[[i, c]];
            if r == 0.0 {
                continue;
            }
            for j in 0..d {
                means[[c, j]] += r * data[[i, j]];
            }
        }
    }
    for c in 0..k {
        for j in 0..d {
            means[[c, j]] /= nk[c];
            if !means[[c, j]].is_finite() {
                return Err(Error::DegenerateComponent { component: c });
            }
        }
    }

    // Weighted scatter of centered points, one matrix per component
    let mut covariances = Vec::with_capacity(k);
    let mut diff = vec![0.0_f64; d];
    for c in 0..k {
        let mut cov = Array2::<f64>::zeros((d, d));
        for i in 0..n {
            let r = resp[[i, c]];
            if r == 0.0 {
                continue;
            }
            for j in 0..d {
                diff[j] = data[[i, j]] - means[[c, j]];
            }
            for a in 0..d {
                let ra = r * diff[a];
                for b in a..d {
                    cov[[a, b]] += ra * diff[b];
                }
            }
        }
        for a in 0..d {
            for b in a..d {
                cov[[a, b]] /= nk[c];
                if b > a {
                    cov[[b, a]] = cov[[a, b]]; // symmetric
                }
            }
            cov[[a, a]] += reg_covar;
        }
        if cov.iter().any(|v| !v.is_finite()) {
            return Err(Error::DegenerateComponent { component: c });
        }
        covariances.push(cov);
    }

    Ok(MixtureModel {
        weights,
        means,
        covariances,
    })
}

/// Variational lower bound of the data log-likelihood.
///
/// `sum_ic r_ic (ln w_c + ln N(x_i; mu_c, Sigma_c)) - sum_ic r_ic ln r_ic`
/// with the convention `0 ln 0 = 0`. Non-decreasing across consecutive
/// E/M pairs; used both as the stopping criterion and to rank restarts.
pub fn lower_bound(step: &EStep) -> f64 {
    let (n, k) = step.responsibilities.dim();
    let mut total = 0.0;
    for i in 0..n {
        for c in 0..k {
            let r = step.responsibilities[[i, c]];
            if r > 0.0 {
                total += r * (step.log_joint[[i, c]] - r.ln());
            }
        }
    }
    total
}

/// Per-dimension variance of the dataset, as a diagonal covariance matrix
/// with `reg_covar` added. Shared starting covariance for all components.
pub(crate) fn data_variance_diag(data: &Array2<f64>, reg_covar: f64) -> Array2<f64> {
    let (n, d) = data.dim();
    let mut mean = vec![0.0_f64; d];
    for i in 0..n {
        for j in 0..d {
            mean[j] += data[[i, j]];
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut cov = Array2::<f64>::zeros((d, d));
    for i in 0..n {
        for j in 0..d {
            let diff = data[[i, j]] - mean[j];
            cov[[j, j]] += diff * diff;
        }
    }
    for j in 0..d {
        cov[[j, j]] = cov[[j, j]] / n as f64 + reg_covar;
    }
    cov
}

/// Random initialization: random positive weights normalized to sum 1,
/// means drawn as distinct data points, covariances from the per-dimension
/// data variance. Caller guarantees `k <= n`.
pub(crate) fn random_init(
    data: &Array2<f64>,
    k: usize,
    reg_covar: f64,
    rng: &mut StdRng,
) -> MixtureModel {
    let d = data.ncols();

    let mut weights = Array1::from_iter((0..k).map(|_| rng.random_range(0.5..1.5)));
    let total = weights.sum();
    weights.mapv_inplace(|w| w / total);

    let picks = rand::seq::index::sample(rng, data.nrows(), k);
    let mut means = Array2::<f64>::zeros((k, d));
    for (c, idx) in picks.into_iter().enumerate() {
        for j in 0..d {
            means[[c, j]] = data[[idx, j]];
        }
    }

    let cov = data_variance_diag(data, reg_covar);
    let covariances = vec![cov; k];

    MixtureModel {
        weights,
        means,
        covariances,
    }
}
