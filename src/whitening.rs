//! Centering and whitening of the observations
//!
//! The covariance of the centered observations is decomposed as `Σ = E D Eᵗ` and the
//! whitening matrix is `V = D^{-1/2} Eᵗ`, restricted to the leading eigenpairs. The covariance
//! is normalized by the number of samples `N`, so the whitened data `Z = V Y_c` satisfies
//! `Z Zᵗ / N = I` exactly whenever no eigenvalue had to be clamped.
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{IcaError, Result};
use crate::linalg::eigh_descending;
use crate::Float;

/// Learned whitening transform of a batch of observations
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Whitening<F> {
    mean: Array1<F>,
    matrix: Array2<F>,
    dewhitening: Array2<F>,
    eigenvalues: Array1<F>,
    clamped: usize,
}

/// Output of the whitening stage
#[derive(Debug, Clone)]
pub struct Whitened<F> {
    /// Centered observations `Y_c`, channels x samples
    pub centered: Array2<F>,
    /// Whitened data `Z = V Y_c`, components x samples
    pub data: Array2<F>,
    pub whitening: Whitening<F>,
}

/// Center the observations by subtracting the mean of each channel (row)
///
/// Returns the centered matrix and the mean vector. `None` when there are no samples.
pub fn center<F: Float, D: Data<Elem = F>>(
    y: &ArrayBase<D, Ix2>,
) -> Option<(Array2<F>, Array1<F>)> {
    let mean = y.mean_axis(Axis(1))?;
    let centered = y - &mean.view().insert_axis(Axis(1));

    Some((centered, mean))
}

/// Sample covariance `Y_c Y_cᵗ / N` of centered observations
pub fn covariance<F: Float, D: Data<Elem = F>>(centered: &ArrayBase<D, Ix2>) -> Array2<F> {
    let nsamples = F::cast(centered.ncols().max(1));
    centered.dot(&centered.t()) / nsamples
}

/// Center and whiten the observations `y` (channels x samples), keeping `ncomponents`
/// directions of largest variance
///
/// # Errors
///
/// [`IcaError::DegenerateInput`] when there are fewer than two samples, when the number of
/// samples does not exceed the number of components (centering consumes one degree of
/// freedom, so `N = C` always fails), when every channel is constant, or when one of the
/// retained eigenvalues of the covariance is zero up to floating point tolerance.
pub fn whiten<F: Float, D: Data<Elem = F>>(
    y: &ArrayBase<D, Ix2>,
    ncomponents: usize,
    eigen_floor: F,
) -> Result<Whitened<F>> {
    let (nchannels, nsamples) = y.dim();

    if ncomponents == 0 || ncomponents > nchannels {
        return Err(IcaError::InvalidValue(format!(
            "ncomponents must be between 1 and the number of channels {}, got {}",
            nchannels, ncomponents
        )));
    }
    if nsamples < 2 || nsamples <= ncomponents {
        return Err(IcaError::degenerate(
            nchannels,
            nsamples,
            f64::INFINITY,
            format!(
                "{} samples cannot be whitened into {} components, at least {} are needed",
                nsamples,
                ncomponents,
                (ncomponents + 1).max(2)
            ),
        ));
    }
    if y.iter().any(|x| !x.is_finite()) {
        return Err(IcaError::InvalidValue(
            "observations contain non-finite values".to_string(),
        ));
    }

    let (centered, mean) = match center(y) {
        Some(x) => x,
        None => {
            return Err(IcaError::degenerate(
                nchannels,
                nsamples,
                f64::INFINITY,
                "no samples",
            ))
        }
    };

    let (eigenvalues, eigenvectors) = eigh_descending(&covariance(&centered))?;

    let largest = eigenvalues[0];
    if !(largest > F::zero()) || !largest.is_finite() {
        return Err(IcaError::degenerate(
            nchannels,
            nsamples,
            f64::INFINITY,
            "every channel has zero variance",
        ));
    }

    // backward error scale of the symmetric eigensolver, anything below is numerically zero
    let zero_tol = largest * F::epsilon() * F::cast(nchannels * nchannels);
    let floor = (eigen_floor * largest).max(zero_tol);

    let retained = eigenvalues.slice(s![..ncomponents]);
    if let Some(rank) = retained.iter().position(|&l| l <= zero_tol) {
        let smallest = retained[ncomponents - 1];
        let condition = if smallest > F::zero() {
            (largest / smallest).to_f64().unwrap_or(f64::INFINITY)
        } else {
            f64::INFINITY
        };
        return Err(IcaError::degenerate(
            nchannels,
            nsamples,
            condition,
            format!(
                "rank-deficient covariance, only {} of {} requested components have positive variance",
                rank, ncomponents
            ),
        ));
    }

    let clamped = retained.iter().filter(|&&l| l < floor).count();
    let scale = retained.mapv(|l| l.max(floor).sqrt());

    let basis = eigenvectors.slice(s![.., ..ncomponents]);
    // V = D^{-1/2} Eᵗ
    let matrix = &basis.t() / &scale.view().insert_axis(Axis(1));
    // pseudo-inverse of V, E D^{1/2}
    let dewhitening = &basis * &scale.view().insert_axis(Axis(0));

    let data = matrix.dot(&centered);

    let whitening = Whitening {
        mean,
        matrix,
        dewhitening,
        eigenvalues,
        clamped,
    };

    tracing::debug!(
        channels = nchannels,
        samples = nsamples,
        components = ncomponents,
        condition = whitening.condition().to_f64().unwrap_or(f64::NAN),
        clamped,
        "whitened observations"
    );

    Ok(Whitened {
        centered,
        data,
        whitening,
    })
}

impl<F: Float> Whitening<F> {
    /// Per-channel mean of the observations
    pub fn mean(&self) -> &Array1<F> {
        &self.mean
    }

    /// Whitening matrix `V`, components x channels
    pub fn matrix(&self) -> &Array2<F> {
        &self.matrix
    }

    /// Pseudo-inverse of the whitening matrix, channels x components
    pub fn dewhitening(&self) -> &Array2<F> {
        &self.dewhitening
    }

    /// All eigenvalues of the covariance, in descending order and before clamping
    pub fn eigenvalues(&self) -> &Array1<F> {
        &self.eigenvalues
    }

    pub fn ncomponents(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of retained eigenvalues that were raised to the floor
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    /// Condition estimate of the retained covariance spectrum after clamping,
    /// `λ_max / λ_min`. The whitening matrix has condition `sqrt` of this value.
    pub fn condition(&self) -> F {
        let scale = self.dewhitening.map_axis(Axis(0), |col| {
            col.iter().map(|x| x.powi(2)).sum::<F>()
        });
        let largest = scale.iter().cloned().fold(F::zero(), |a, b| a.max(b));
        let smallest = scale.iter().cloned().fold(F::infinity(), |a, b| a.min(b));
        largest / smallest
    }

    /// Center and whiten new observations with the learned transform
    pub fn transform<D: Data<Elem = F>>(&self, y: &ArrayBase<D, Ix2>) -> Array2<F> {
        let centered = y - &self.mean.view().insert_axis(Axis(1));
        self.matrix.dot(&centered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand_xoshiro::Xoshiro256Plus;

    fn mixed_uniform(nsamples: usize) -> Array2<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let sources = Array::random_using((3, nsamples), Uniform::new(-1., 1.), &mut rng);
        let mixing = array![[1., 0.5, 0.2], [0.3, 2., 0.1], [0.7, 0.4, 3.]];
        mixing.dot(&sources) + 5.
    }

    #[test]
    fn test_center() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let (centered, mean) = center(&x).unwrap();

        assert_abs_diff_eq!(mean, array![2., 5.], epsilon = 1e-12);
        assert_abs_diff_eq!(
            centered.mean_axis(Axis(1)).unwrap(),
            array![0., 0.],
            epsilon = 1e-12
        );
    }

    #[test]
    fn whitened_covariance_is_identity() {
        let y = mixed_uniform(2000);
        let whitened = whiten(&y, 3, 1e-10).unwrap();

        assert_eq!(whitened.data.dim(), (3, 2000));
        assert_eq!(whitened.whitening.clamped(), 0);
        assert_abs_diff_eq!(covariance(&whitened.data), Array2::eye(3), epsilon = 1e-9);
        assert_abs_diff_eq!(
            whitened.data.mean_axis(Axis(1)).unwrap(),
            Array1::zeros(3),
            epsilon = 1e-9
        );
    }

    #[test]
    fn dewhitening_inverts_whitening() {
        let y = mixed_uniform(500);
        let whitened = whiten(&y, 3, 1e-10).unwrap();
        let w = &whitened.whitening;

        assert_abs_diff_eq!(w.matrix().dot(w.dewhitening()), Array2::eye(3), epsilon = 1e-9);
        assert_abs_diff_eq!(w.transform(&y), whitened.data, epsilon = 1e-9);
    }

    #[test]
    fn fewer_components_keep_largest_variance() {
        let y = mixed_uniform(500);
        let whitened = whiten(&y, 2, 1e-10).unwrap();

        assert_eq!(whitened.data.dim(), (2, 500));
        assert_eq!(whitened.whitening.matrix().dim(), (2, 3));
        assert_eq!(whitened.whitening.eigenvalues().len(), 3);
        assert_abs_diff_eq!(covariance(&whitened.data), Array2::eye(2), epsilon = 1e-9);
    }

    #[test]
    fn duplicated_channel_is_degenerate() {
        let mut y = mixed_uniform(500);
        let first = y.row(0).to_owned();
        y.row_mut(2).assign(&first);

        let res = whiten(&y, 3, 1e-10);
        assert!(matches!(res, Err(IcaError::DegenerateInput { .. })));
        // dropping the redundant direction makes the problem well posed again
        assert!(whiten(&y, 2, 1e-10).is_ok());
    }

    #[test]
    fn constant_channels_are_degenerate() {
        let y = Array2::<f64>::from_elem((2, 10), 3.);
        assert!(matches!(
            whiten(&y, 2, 1e-10),
            Err(IcaError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn too_few_samples() {
        let y = mixed_uniform(3);
        match whiten(&y, 3, 1e-10) {
            Err(IcaError::DegenerateInput {
                channels, samples, ..
            }) => {
                assert_eq!((channels, samples), (3, 3));
            }
            other => panic!("expected degenerate input, got {:?}", other),
        }
        assert!(whiten(&mixed_uniform(2), 3, 1e-10).is_err());
    }

    #[test]
    fn tiny_eigenvalues_are_clamped() {
        let mut y = mixed_uniform(1000);
        y.row_mut(2).mapv_inplace(|x| x * 1e-4);

        // the third direction carries ~1e-8 of the largest variance, below a floor of 1e-6
        let whitened = whiten(&y, 3, 1e-6).unwrap();
        assert_eq!(whitened.whitening.clamped(), 1);

        let cov = covariance(&whitened.data);
        assert_abs_diff_eq!(cov[[0, 0]], 1., epsilon = 1e-9);
        assert!(cov[[2, 2]] < 1.);
    }

    #[test]
    fn low_variance_source_in_single_precision() {
        let nsamples = 100_000;
        let mut rng = Xoshiro256Plus::seed_from_u64(31);
        let mut y: Array2<f32> =
            Array::random_using((4, nsamples), Uniform::new(-1f32, 1.), &mut rng);
        // a hundred times weaker than the other channels, 1e-4 of their variance
        y.row_mut(3).mapv_inplace(|x| x * 0.01);

        let whitened = whiten(&y, 4, 1e-10).unwrap();
        assert_eq!(whitened.whitening.clamped(), 0);

        let cov = covariance(&whitened.data);
        for i in 0..4 {
            assert_abs_diff_eq!(cov[[i, i]], 1., epsilon = 1e-2);
        }
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut y = mixed_uniform(100);
        y[[1, 5]] = f64::NAN;
        assert!(matches!(
            whiten(&y, 3, 1e-10),
            Err(IcaError::InvalidValue(_))
        ));
    }
}
