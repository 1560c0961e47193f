//! Error types for gaussmix

use thiserror::Error;

/// Main error type for gaussmix operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Dimension mismatch: model has dimension {expected}, data has dimension {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Covariance matrix of component {component} is singular or not positive-definite")]
    SingularCovariance { component: usize },

    #[error("Component {component} is degenerate (responsibility mass collapsed)")]
    DegenerateComponent { component: usize },

    #[error("All {attempts} restart(s) failed; no valid mixture model was produced")]
    AllRestartsFailed { attempts: usize },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure only abandons the current restart attempt.
    ///
    /// Singular covariances and collapsed components are expected outcomes
    /// of an unlucky initialization; the restart controller catches them and
    /// tries again. Everything else propagates to the caller.
    pub fn is_restart_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SingularCovariance { .. } | Error::DegenerateComponent { .. }
        )
    }
}

/// Result type alias for gaussmix operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::SingularCovariance { component: 0 }.is_restart_recoverable());
        assert!(Error::DegenerateComponent { component: 2 }.is_restart_recoverable());
        assert!(!Error::AllRestartsFailed { attempts: 4 }.is_restart_recoverable());
        assert!(!Error::InvalidParameter {
            name: "n_components",
            value: "0".into(),
            reason: "must be >= 1".into(),
        }
        .is_restart_recoverable());
    }

    #[test]
    fn test_display_contains_component() {
        let msg = Error::SingularCovariance { component: 3 }.to_string();
        assert!(msg.contains('3'));
    }
}
