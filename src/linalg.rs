//! Backend-neutral symmetric eigen-decomposition
//!
//! Without the `blas` feature the pure Rust solver of `linfa-linalg` is used, otherwise the
//! LAPACK routines behind `ndarray-linalg`. Callers only see eigenpairs sorted by descending
//! eigenvalue, so swapping the backend never changes their code.
use std::cmp::Ordering;

#[cfg(not(feature = "blas"))]
use linfa_linalg::eigh::Eigh;
use ndarray::{Array1, Array2, Axis};
#[cfg(feature = "blas")]
use ndarray_linalg::{eigh::Eigh, solveh::UPLO};

use crate::error::Result;
use crate::Float;

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix, in descending order of
/// the eigenvalues
pub(crate) fn eigh_descending<F: Float>(a: &Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    #[cfg(feature = "blas")]
    let (vals, vecs) = {
        let (vals, vecs) = a
            .mapv(|x| <F::Lapack as Float>::cast(x))
            .eigh(UPLO::Upper)?;
        (vals.mapv(|x| F::cast(x)), vecs.mapv(|x| F::cast(x)))
    };
    #[cfg(not(feature = "blas"))]
    let (vals, vecs) = a.eigh()?;

    let mut order: Vec<usize> = (0..vals.len()).collect();
    order.sort_by(|&i, &j| vals[j].partial_cmp(&vals[i]).unwrap_or(Ordering::Equal));

    let vals = order.iter().map(|&i| vals[i]).collect::<Array1<F>>();
    let vecs = vecs.select(Axis(1), &order);

    Ok((vals, vecs))
}
