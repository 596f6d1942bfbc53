//! Orthogonality constraints on the rotation matrix and the convergence bookkeeping
//!
//! Every estimate of the rotation `W` handed back by the optimizer has orthonormal rows. The
//! symmetric scheme re-orthonormalizes the whole matrix after a sweep, the deflation scheme
//! projects each new direction out of the span of the previous ones.
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::hyperparams::Orthogonalization;
use crate::linalg::eigh_descending;
use crate::Float;

/// Symmetric decorrelation
///
/// W <- (W * W.T)^{-1/2} * W
pub fn sym_decorrelation<F: Float>(w: &Array2<F>) -> Result<Array2<F>> {
    let (eig_val, eig_vec) = eigh_descending(&w.dot(&w.t()))?;

    let tmp = &eig_vec
        * &(eig_val.mapv(|x| x.sqrt()).mapv(|x| {
            // We lower bound the float value at 1e-7 when taking the reciprocal
            let lower_bound = F::cast(1e-7);
            if x < lower_bound {
                return lower_bound.recip();
            }
            x.recip()
        }))
        .insert_axis(Axis(0));

    Ok(tmp.dot(&eig_vec.t()).dot(w))
}

/// Remove from `w` its projection onto each of the (orthonormal) rows of `basis`
pub fn gram_schmidt<F: Float, D: Data<Elem = F>>(w: &mut Array1<F>, basis: &ArrayBase<D, Ix2>) {
    for row in basis.outer_iter() {
        let proj = w.dot(&row);
        w.scaled_add(-proj, &row);
    }
}

/// Scale `w` to unit length, returning its previous norm
pub fn normalize<F: Float>(w: &mut Array1<F>) -> F {
    let norm = w.dot(&*w).sqrt();
    if norm > F::zero() {
        w.mapv_inplace(|x| x / norm);
    }
    norm
}

/// Frobenius norm of `W Wᵗ - I`
pub fn orthogonality_error<F: Float, D: Data<Elem = F>>(w: &ArrayBase<D, Ix2>) -> F {
    let gram = w.dot(&w.t()) - Array2::<F>::eye(w.nrows());
    gram.iter().map(|x| x.powi(2)).sum::<F>().sqrt()
}

/// Deviation of one direction from orthonormality against the rows of `basis`: the largest
/// of the norm defect and the absolute inner products with the basis
pub fn direction_error<F, S, D>(w: &ArrayBase<S, Ix1>, basis: &ArrayBase<D, Ix2>) -> F
where
    F: Float,
    S: Data<Elem = F>,
    D: Data<Elem = F>,
{
    let norm_defect = (w.dot(w).sqrt() - F::one()).abs();
    basis
        .outer_iter()
        .map(|row| w.dot(&row).abs())
        .fold(norm_defect, |a, b| a.max(b))
}

/// Convergence metric of a single direction, `| |<w_new, w_old>| - 1 |`
///
/// The absolute value of the inner product makes it invariant to sign flips.
pub fn direction_change<F: Float>(w_new: ArrayView1<F>, w_old: ArrayView1<F>) -> F {
    (w_new.dot(&w_old).abs() - F::one()).abs()
}

/// Row-wise convergence metric between two consecutive rotation estimates
pub fn sweep_change<F: Float>(w_new: &Array2<F>, w_old: &Array2<F>) -> Array1<F> {
    w_new
        .outer_iter()
        .zip(w_old.outer_iter())
        .map(|(a, b)| direction_change(a, b))
        .collect()
}

/// The optimizer exhausted its iteration budget
///
/// This is not an error: the best estimate found so far is still returned, this value only
/// documents how far it is from the requested tolerance.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("ICA did not converge after {iterations} iterations, metric {metric:e} above tolerance {tolerance:e}")]
pub struct NonConvergenceWarning {
    pub iterations: usize,
    /// Worst per-direction convergence metric of the returned estimate
    pub metric: f64,
    pub tolerance: f64,
}

/// Convergence report of a fit
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Convergence<F> {
    pub(crate) scheme: Orthogonalization,
    pub(crate) converged: bool,
    pub(crate) iterations: usize,
    pub(crate) direction_metrics: Array1<F>,
    pub(crate) max_orthogonality_error: F,
    pub(crate) tolerance: F,
}

impl<F: Float> Convergence<F> {
    pub fn scheme(&self) -> Orthogonalization {
        self.scheme
    }

    /// Whether every direction reached the tolerance
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of sweeps (symmetric) or of single-direction updates summed over all
    /// directions (deflation)
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Final convergence metric of each direction
    pub fn direction_metrics(&self) -> &Array1<F> {
        &self.direction_metrics
    }

    /// Largest convergence metric over all directions
    pub fn metric(&self) -> F {
        self.direction_metrics
            .iter()
            .cloned()
            .fold(F::zero(), |a, b| if b.is_nan() { F::infinity() } else { a.max(b) })
    }

    /// Worst deviation from orthonormality observed after any orthogonalization step
    pub fn max_orthogonality_error(&self) -> F {
        self.max_orthogonality_error
    }

    /// Present when the iteration budget ran out before convergence
    pub fn warning(&self) -> Option<NonConvergenceWarning> {
        if self.converged {
            return None;
        }
        Some(NonConvergenceWarning {
            iterations: self.iterations,
            metric: self.metric().to_f64().unwrap_or(f64::NAN),
            tolerance: self.tolerance.to_f64().unwrap_or(f64::NAN),
        })
    }
}
