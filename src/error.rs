//! Error types of the separation engine
//!
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IcaError>;

/// An error when separating sources with ICA
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IcaError {
    /// The observations cannot be whitened: too few samples, constant channels or a
    /// rank-deficient covariance matrix
    #[error("degenerate input of shape {channels}x{samples}: {reason} (condition estimate {condition:e})")]
    DegenerateInput {
        channels: usize,
        samples: usize,
        condition: f64,
        reason: String,
    },
    /// The assembled unmixing matrix is numerically singular, which signals an upstream
    /// numerical breakdown
    #[error("unmixing matrix of shape {rows}x{cols} is numerically singular (condition estimate {condition:e})")]
    SingularUnmixing {
        rows: usize,
        cols: usize,
        condition: f64,
    },
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid value encountered: {0}")]
    InvalidValue(String),
    #[error("tolerance should be non-negative and finite but is {0}")]
    InvalidTolerance(f32),
    #[error("eigenvalue floor should be in [0, 1) but is {0}")]
    InvalidEigenFloor(f32),
    #[error("iteration cap `{0}` must be at least one")]
    InvalidIterations(&'static str),
    /// The mixing estimate was not computed during fitting
    #[error("mixing matrix was not computed, enable `compute_mixing` before fitting")]
    MixingNotComputed,
    /// Errors encountered during linear algebra operations
    #[error("Linalg Error: {0}")]
    Linalg(#[from] linfa_linalg::LinalgError),
    #[cfg(feature = "blas")]
    #[error("Linalg BLAS Error: {0}")]
    LinalgBlas(#[from] ndarray_linalg::error::LinalgError),
}

impl IcaError {
    pub(crate) fn degenerate(
        channels: usize,
        samples: usize,
        condition: f64,
        reason: impl Into<String>,
    ) -> Self {
        IcaError::DegenerateInput {
            channels,
            samples,
            condition,
            reason: reason.into(),
        }
    }
}
