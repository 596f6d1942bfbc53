//! Contrast functions used as a proxy for non-Gaussianity
//!
//! Each variant provides the nonlinearity `g` and its derivative `g'` that enter the
//! fixed-point update `w⁺ = E[z g(wᵗz)] − E[g'(wᵗz)] w`.
use ndarray::{Array1, Array2, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::Float;

/// Some standard non-linear functions
///
/// * `Logcosh(alpha)` uses `g(u) = tanh(alpha u)`, a good general purpose choice that is
///   robust to outliers. `alpha` must lie in `[1, 2]`.
/// * `Exp` uses `g(u) = u exp(-u²/2)`, suited for highly super-Gaussian sources.
/// * `Cube` uses `g(u) = u³`, the kurtosis based contrast. It is sensitive to outliers but
///   converges fast on sub-Gaussian sources.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum GFunc {
    Logcosh(f64),
    Exp,
    Cube,
}

impl Default for GFunc {
    fn default() -> Self {
        GFunc::Logcosh(1.)
    }
}

impl GFunc {
    /// Evaluate the contrast on the projections `wx` (one row per direction)
    ///
    /// Returns `g(wx)` element-wise and the per-row sample mean of `g'(wx)`.
    pub fn exec<A: Float>(&self, wx: &Array2<A>) -> (Array2<A>, Array1<A>) {
        match self {
            Self::Cube => Self::cube(wx),
            Self::Exp => Self::exp(wx),
            Self::Logcosh(alpha) => Self::logcosh(wx, A::cast(*alpha)),
        }
    }

    /// Checks the shape parameter of the contrast function
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Self::Logcosh(alpha) if !(1.0..=2.0).contains(alpha) => Err(format!(
                "alpha must be between 1 and 2 inclusive, got {}",
                alpha
            )),
            _ => Ok(()),
        }
    }

    fn cube<A: Float>(x: &Array2<A>) -> (Array2<A>, Array1<A>) {
        let mut gx = x.to_owned();
        map_inplace(&mut gx, |x| x.powi(3));
        let mut g_x = x.to_owned();
        map_inplace(&mut g_x, |x| A::cast(3.) * x.powi(2));

        (gx, row_means(&g_x))
    }

    fn exp<A: Float>(x: &Array2<A>) -> (Array2<A>, Array1<A>) {
        let mut exp = x.to_owned();
        map_inplace(&mut exp, |x| (-x.powi(2) / A::cast(2.)).exp());

        let gx = x * &exp;
        let g_x = x.mapv(|x| A::one() - x.powi(2)) * &exp;

        (gx, row_means(&g_x))
    }

    fn logcosh<A: Float>(x: &Array2<A>, alpha: A) -> (Array2<A>, Array1<A>) {
        let mut gx = x.to_owned();
        map_inplace(&mut gx, |x| (x * alpha).tanh());
        let g_x = gx.mapv(|x| alpha * (A::one() - x.powi(2)));

        (gx, row_means(&g_x))
    }
}

fn row_means<A: Float>(x: &Array2<A>) -> Array1<A> {
    x.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(x.nrows()))
}

// Split across threads with the `rayon` feature, rows stay independent until orthogonalization
#[cfg(feature = "rayon")]
fn map_inplace<A: Float>(x: &mut Array2<A>, f: impl Fn(A) -> A + Sync + Send) {
    x.par_mapv_inplace(f);
}

#[cfg(not(feature = "rayon"))]
fn map_inplace<A: Float>(x: &mut Array2<A>, f: impl Fn(A) -> A + Sync + Send) {
    x.mapv_inplace(f);
}
