//! Fixed-point optimization of the contrast function over whitened data
//!
//! One update of a direction `w` reads
//!
//! ```text
//! w⁺ = E[z g(wᵗz)] − E[g'(wᵗz)] w
//! ```
//!
//! and is followed by an orthogonalization step, either over the whole rotation at once
//! ([`Orthogonalization::Symmetric`]) or against the directions already found
//! ([`Orthogonalization::Deflation`]).
use ndarray::{s, Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};
use ndarray_rand::{rand_distr::StandardNormal, RandomExt};
use rand::SeedableRng;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

use crate::error::{IcaError, Result};
use crate::hyperparams::{IcaValidParams, Orthogonalization};
use crate::orthogonal::{
    direction_change, direction_error, gram_schmidt, normalize, orthogonality_error,
    sweep_change, sym_decorrelation, Convergence,
};
use crate::Float;

/// Rotation of the whitened space together with the report of how it was found
#[derive(Debug, Clone)]
pub(crate) struct Rotation<F> {
    pub w: Array2<F>,
    pub convergence: Convergence<F>,
}

impl<F: Float> IcaValidParams<F> {
    /// Estimate the orthogonal rotation maximizing non-Gaussianity of the whitened data `z`
    /// (components x samples)
    pub(crate) fn estimate_rotation(&self, z: &Array2<F>) -> Result<Rotation<F>> {
        let w_init = self.initial_rotation(z.nrows())?;

        let rotation = match self.orthogonalization() {
            Orthogonalization::Symmetric => self.ica_parallel(z, &w_init)?,
            Orthogonalization::Deflation => self.ica_deflation(z, &w_init)?,
        };

        if let Some(warning) = rotation.convergence.warning() {
            tracing::warn!(%warning, "NonConvergenceWarning, returning best estimate");
        }

        Ok(rotation)
    }

    fn initial_rotation(&self, ncomponents: usize) -> Result<Array2<F>> {
        if let Some(w) = self.w_init() {
            if w.dim() != (ncomponents, ncomponents) {
                return Err(IcaError::InvalidValue(format!(
                    "w_init must be {0}x{0} to match the number of components, got {1}x{2}",
                    ncomponents,
                    w.nrows(),
                    w.ncols()
                )));
            }
            return Ok(w.clone());
        }

        // We initialize the de-mixing matrix with a standard normal distribution
        let w: Array2<f64> = if let Some(seed) = self.random_state() {
            let mut rng = Xoshiro256Plus::seed_from_u64(*seed);
            Array::random_using((ncomponents, ncomponents), StandardNormal, &mut rng)
        } else {
            Array::random((ncomponents, ncomponents), StandardNormal)
        };

        Ok(w.mapv(F::cast))
    }

    // One fixed-point step for every row of `w`, without orthogonalization
    fn fixed_point<S: Data<Elem = F>>(&self, x: &Array2<F>, w: &ArrayBase<S, Ix2>) -> Array2<F> {
        let nsamples = F::cast(x.ncols());
        let (gwtx, g_wtx) = self.gfunc().exec(&w.dot(x));

        let lhs = gwtx.dot(&x.t()) / nsamples;
        let rhs = w * &g_wtx.insert_axis(Axis(1));

        lhs - rhs
    }

    // Parallel FastICA, all directions are updated in one sweep
    fn ica_parallel(&self, x: &Array2<F>, w_init: &Array2<F>) -> Result<Rotation<F>> {
        let tol = self.tol();
        let mut w = sym_decorrelation(&independent_rows(w_init))?;
        let mut max_orthogonality_error = orthogonality_error(&w);

        let mut best_w = w.clone();
        let mut best_metrics = Array1::from_elem(w.nrows(), F::infinity());
        let mut best_lim = F::infinity();

        let mut sweeps = 0;
        let mut converged = false;

        while sweeps < self.max_sweeps() {
            sweeps += 1;

            let wnew = sym_decorrelation(&self.fixed_point(x, &w))?;
            max_orthogonality_error = max_orthogonality_error.max(orthogonality_error(&wnew));

            // every row has to settle within the same sweep
            let metrics = sweep_change(&wnew, &w);
            let lim = metrics.max().map(|x| *x).unwrap_or_else(|_| F::infinity());

            tracing::trace!(sweep = sweeps, metric = as_f64(lim), "symmetric sweep");

            w = wnew;

            if lim < best_lim {
                best_lim = lim;
                best_w = w.clone();
                best_metrics = metrics;
            }

            if lim < tol {
                converged = true;
                break;
            }
        }

        Ok(Rotation {
            w: best_w,
            convergence: Convergence {
                scheme: Orthogonalization::Symmetric,
                converged,
                iterations: sweeps,
                direction_metrics: best_metrics,
                max_orthogonality_error,
                tolerance: tol,
            },
        })
    }

    // Deflationary FastICA, directions are estimated one at a time
    fn ica_deflation(&self, x: &Array2<F>, w_init: &Array2<F>) -> Result<Rotation<F>> {
        let ncomponents = w_init.nrows();
        let tol = self.tol();

        let mut w = Array2::zeros((ncomponents, ncomponents));
        let mut direction_metrics = Array1::from_elem(ncomponents, F::infinity());
        let mut max_orthogonality_error = F::zero();
        let mut iterations = 0;
        let mut converged = true;

        for j in 0..ncomponents {
            let mut wj = w_init.row(j).to_owned();
            {
                let basis = w.slice(s![..j, ..]);
                gram_schmidt(&mut wj, &basis);
                if normalize(&mut wj) <= F::epsilon() {
                    wj = seed_direction(&basis);
                }
            }

            let mut best = wj.clone();
            let mut best_lim = F::infinity();
            let mut direction_converged = false;

            for _ in 0..self.max_iter() {
                iterations += 1;

                let basis = w.slice(s![..j, ..]);
                let mut wnew = self
                    .fixed_point(x, &wj.view().insert_axis(Axis(0)))
                    .index_axis_move(Axis(0), 0);
                gram_schmidt(&mut wnew, &basis);
                normalize(&mut wnew);
                max_orthogonality_error =
                    max_orthogonality_error.max(direction_error(&wnew, &basis));

                let lim = direction_change(wnew.view(), wj.view());
                tracing::trace!(direction = j, metric = as_f64(lim), "deflation update");
                wj = wnew;

                if lim < best_lim {
                    best_lim = lim;
                    best = wj.clone();
                }

                if lim < tol {
                    direction_converged = true;
                    break;
                }
            }

            tracing::debug!(
                direction = j,
                converged = direction_converged,
                metric = as_f64(best_lim),
                "deflation direction"
            );

            converged &= direction_converged;
            direction_metrics[j] = best_lim;
            w.row_mut(j).assign(&best);
        }

        max_orthogonality_error = max_orthogonality_error.max(orthogonality_error(&w));

        Ok(Rotation {
            w,
            convergence: Convergence {
                scheme: Orthogonalization::Deflation,
                converged,
                iterations,
                direction_metrics,
                max_orthogonality_error,
                tolerance: tol,
            },
        })
    }
}

/// Orthonormal completion of a rank-deficient starting rotation
///
/// Rows spanned by earlier rows, up to `sqrt(eps)` of the largest row norm, are replaced by
/// [`seed_direction`]. Matrices with independent rows are returned unchanged.
fn independent_rows<F: Float>(w: &Array2<F>) -> Array2<F> {
    let scale = w
        .outer_iter()
        .map(|row| row.dot(&row).sqrt())
        .fold(F::zero(), |a, b| a.max(b));
    let threshold = scale * F::epsilon().sqrt();

    let mut basis = Array2::zeros(w.dim());
    let mut deficient = false;

    for (j, row) in w.outer_iter().enumerate() {
        let mut wj = row.to_owned();
        gram_schmidt(&mut wj, &basis.slice(s![..j, ..]));
        if normalize(&mut wj) <= threshold {
            deficient = true;
            wj = seed_direction(&basis.slice(s![..j, ..]));
        }
        basis.row_mut(j).assign(&wj);
    }

    if deficient {
        tracing::debug!("initial rotation is rank deficient, completed with orthonormal rows");
        basis
    } else {
        w.clone()
    }
}

/// Canonical basis vector with the largest part outside the span of `basis`, projected and
/// normalized. Used when an initial direction is already spanned by earlier ones.
fn seed_direction<F: Float>(basis: &ArrayView2<F>) -> Array1<F> {
    let dim = basis.ncols();
    let mut best = Array1::zeros(dim);
    let mut best_norm = F::zero();

    for i in 0..dim {
        let mut e = Array1::zeros(dim);
        e[i] = F::one();
        gram_schmidt(&mut e, basis);

        let norm = e.dot(&e);
        if norm > best_norm {
            best_norm = norm;
            best = e;
        }
    }

    normalize(&mut best);
    best
}

pub(crate) fn as_f64<F: Float>(x: F) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}
