//! Gaussian mixture fitting via expectation-maximization
//!
//! Unsupervised density estimation and soft clustering. The engine fits a
//! mixture of multivariate Gaussians by alternating E- and M-steps until
//! the variational lower bound stops improving, and repeats the whole
//! procedure from independent random initializations, keeping the restart
//! with the highest bound.
//!
//! A restart moves through the phases Initializing → Iterating →
//! (Converged | Failed); a numerically failed restart (singular covariance,
//! dead component, coincident components) is abandoned and the controller
//! moves on to the next one. Only the exhaustion of every restart is an
//! error for the caller.

mod density;
pub mod em;
mod kmeans;

pub use em::{e_step, lower_bound, m_step, EStep};

use gaussmix_core::{Algorithm, Error, FitResult, MixtureModel, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::maybe_rayon::*;

/// Two components whose means and covariances agree elementwise within this
/// tolerance are treated as one collapsed component. EM cannot separate a
/// perfectly symmetric pair, so the restart is abandoned instead.
const COINCIDENT_TOL: f64 = 1e-9;

/// How the first model of a restart is chosen.
#[derive(Debug, Clone, Default)]
pub enum MixtureInit {
    /// Random weights, means drawn as distinct data points, covariances
    /// from the per-dimension data variance
    #[default]
    Random,
    /// A short seeded k-means run places the initial means
    KMeans,
    /// Caller-supplied starting parameters, used for the first restart
    /// only; later restarts fall back to [`MixtureInit::Random`]
    Params(MixtureModel),
}

/// Parameters for Gaussian mixture fitting
#[derive(Debug, Clone)]
pub struct GmmParams {
    /// Number of mixture components
    pub n_components: usize,
    /// Maximum EM iterations per restart (default: 100)
    pub max_iterations: usize,
    /// Relative lower-bound improvement below which a restart stops
    /// (default: 1e-4)
    pub tolerance: f64,
    /// Independent restarts; the one with the highest lower bound wins
    /// (default: 8)
    pub restarts: usize,
    /// Random seed; each restart derives its own deterministic stream
    pub seed: u64,
    /// Regularization added to every covariance diagonal (default: 1e-6)
    pub reg_covar: f64,
    /// Initialization strategy
    pub init: MixtureInit,
}

impl Default for GmmParams {
    fn default() -> Self {
        Self {
            n_components: 2,
            max_iterations: 100,
            tolerance: 1e-4,
            restarts: 8,
            seed: 42,
            reg_covar: 1e-6,
            init: MixtureInit::Random,
        }
    }
}

/// Fit a Gaussian mixture to `data` (shape `(n, d)`, rows are points).
///
/// Restarts are independent — each owns an RNG seeded from `params.seed`
/// and its restart index — and run in parallel when the `parallel` feature
/// is enabled. The result is the same for any execution order or thread
/// count; ties on the lower bound go to the lowest restart index.
///
/// # Errors
/// - [`Error::InvalidParameter`] for empty or non-finite data, zero
///   components, a zero iteration budget or a non-positive tolerance
/// - [`Error::AllRestartsFailed`] when no restart produced a valid model —
///   including `restarts == 0` and `n_components > n`, where no
///   per-component covariance can be estimated
pub fn fit_mixture(data: &Array2<f64>, params: &GmmParams) -> Result<FitResult> {
    let (n, d) = data.dim();
    let k = params.n_components;

    if k == 0 {
        return Err(Error::InvalidParameter {
            name: "n_components",
            value: "0".into(),
            reason: "mixture needs at least one component".into(),
        });
    }
    if n == 0 || d == 0 {
        return Err(Error::InvalidParameter {
            name: "data",
            value: format!("{n}x{d}"),
            reason: "dataset must be non-empty".into(),
        });
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "data",
            value: "non-finite".into(),
            reason: "dataset contains NaN or infinite values".into(),
        });
    }
    if params.max_iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "max_iterations",
            value: "0".into(),
            reason: "iteration budget must be at least 1".into(),
        });
    }
    if !(params.tolerance > 0.0 && params.tolerance.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "tolerance",
            value: params.tolerance.to_string(),
            reason: "must be a positive finite number".into(),
        });
    }
    if !(params.reg_covar >= 0.0 && params.reg_covar.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "reg_covar",
            value: params.reg_covar.to_string(),
            reason: "must be non-negative and finite".into(),
        });
    }
    if let MixtureInit::Params(model) = &params.init {
        if model.n_components() != k || model.dim() != d {
            return Err(Error::InvalidParameter {
                name: "init",
                value: format!("{} components, dimension {}", model.n_components(), model.dim()),
                reason: format!("starting model must have {k} components of dimension {d}"),
            });
        }
        model.check_invariants()?;
    }
    // With fewer points than components at least one covariance has no
    // support; every restart would fail, so fail the call up front.
    if params.restarts == 0 || n < k {
        return Err(Error::AllRestartsFailed { attempts: 0 });
    }

    let outcomes: Vec<Result<RestartFit>> = (0..params.restarts)
        .into_par_iter()
        .map(|restart| run_restart(data, params, restart))
        .collect();

    let mut best: Option<RestartFit> = None;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(fit) => {
                let better = match &best {
                    None => true,
                    Some(current) => fit.lower_bound > current.lower_bound,
                };
                if better {
                    best = Some(fit);
                }
            }
            Err(e) if e.is_restart_recoverable() => failed += 1,
            Err(e) => return Err(e),
        }
    }

    match best {
        Some(fit) => Ok(FitResult {
            model: fit.model,
            lower_bound: fit.lower_bound,
            responsibilities: fit.responsibilities,
            converged: fit.converged,
            n_iter: fit.n_iter,
            failed_restarts: failed,
        }),
        None => Err(Error::AllRestartsFailed {
            attempts: params.restarts,
        }),
    }
}

/// Result of one completed restart
struct RestartFit {
    model: MixtureModel,
    lower_bound: f64,
    responsibilities: Array2<f64>,
    converged: bool,
    n_iter: usize,
}

/// Per-restart seed stream: fixed stride in the seed space so restarts are
/// reproducible independently of execution order.
fn restart_seed(seed: u64, restart: usize) -> u64 {
    seed.wrapping_add((restart as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn run_restart(data: &Array2<f64>, params: &GmmParams, restart: usize) -> Result<RestartFit> {
    let k = params.n_components;
    let mut rng = StdRng::seed_from_u64(restart_seed(params.seed, restart));

    // Initializing
    let mut model = match (&params.init, restart) {
        (MixtureInit::Params(start), 0) => start.clone(),
        (MixtureInit::KMeans, _) => {
            let means = kmeans::kmeans_centroids(data, k, 10, &mut rng);
            let cov = em::data_variance_diag(data, params.reg_covar);
            MixtureModel {
                weights: Array1::from_elem(k, 1.0 / k as f64),
                means,
                covariances: vec![cov; k],
            }
        }
        _ => em::random_init(data, k, params.reg_covar, &mut rng),
    };

    // Iterating: E-step, M-step, score; stop on relative improvement below
    // tolerance or an exhausted budget (reported via `converged`).
    let mut step = em::e_step(data, &model)?;
    let mut bound = em::lower_bound(&step);
    let mut converged = false;
    let mut n_iter = 0;

    for iter in 0..params.max_iterations {
        n_iter = iter + 1;

        model = em::m_step(data, &step.responsibilities, params.reg_covar)?;
        check_distinct_components(&model)?;

        step = em::e_step(data, &model)?;
        let next = em::lower_bound(&step);

        let scale = next.abs().max(bound.abs()).max(1.0);
        let done = (next - bound).abs() <= params.tolerance * scale;
        bound = next;
        if done {
            converged = true;
            break;
        }
    }

    Ok(RestartFit {
        model,
        lower_bound: bound,
        responsibilities: step.responsibilities,
        converged,
        n_iter,
    })
}

/// Reject models where two components collapsed onto one another.
fn check_distinct_components(model: &MixtureModel) -> Result<()> {
    let k = model.n_components();
    for a in 0..k {
        for b in (a + 1)..k {
            let means_close = model
                .means
                .row(a)
                .iter()
                .zip(model.means.row(b).iter())
                .all(|(x, y)| (x - y).abs() <= COINCIDENT_TOL);
            if !means_close {
                continue;
            }
            let covs_close = model.covariances[a]
                .iter()
                .zip(model.covariances[b].iter())
                .all(|(x, y)| (x - y).abs() <= COINCIDENT_TOL);
            if covs_close {
                return Err(Error::DegenerateComponent { component: b });
            }
        }
    }
    Ok(())
}

fn check_dim(model: &MixtureModel, data: &Array2<f64>) -> Result<()> {
    if model.dim() != data.ncols() {
        return Err(Error::DimensionMismatch {
            expected: model.dim(),
            found: data.ncols(),
        });
    }
    Ok(())
}

/// Posterior component probabilities for `data` under a fitted model,
/// shape `(n, k)`; rows sum to 1.
pub fn predict_proba(model: &MixtureModel, data: &Array2<f64>) -> Result<Array2<f64>> {
    check_dim(model, data)?;
    Ok(em::e_step(data, model)?.responsibilities)
}

/// Hard component assignment for `data`: argmax of each posterior row.
pub fn predict(model: &MixtureModel, data: &Array2<f64>) -> Result<Vec<usize>> {
    let proba = predict_proba(model, data)?;
    Ok(proba
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
        .collect())
}

/// Per-point log-likelihood of `data` under a fitted model.
pub fn score_samples(model: &MixtureModel, data: &Array2<f64>) -> Result<Array1<f64>> {
    check_dim(model, data)?;
    Ok(em::e_step(data, model)?.log_norm)
}

/// Gaussian mixture fitting as an [`Algorithm`]
pub struct GaussianMixture;

impl Algorithm for GaussianMixture {
    type Input = Array2<f64>;
    type Output = FitResult;
    type Params = GmmParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "gaussian_mixture"
    }

    fn description(&self) -> &'static str {
        "Fits a mixture of multivariate Gaussians by multi-restart expectation-maximization"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<FitResult> {
        fit_mixture(&input, &params)
    }
}
