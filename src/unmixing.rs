//! Assembly of the unmixing transform and the fitted model
//!
//! The rotation found in whitened space is composed with the whitening matrix into the
//! unmixing matrix `U = W V`. Recovered sources are `S = U Y_c`. Neither their order nor
//! their sign or scale carry meaning, this is inherent to the ICA model.
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{IcaError, Result};
use crate::hyperparams::{IcaParams, IcaValidParams};
use crate::linalg::eigh_descending;
use crate::metrics::{kurtosis, SourceKind};
use crate::optimizer::as_f64;
use crate::orthogonal::{orthogonality_error, Convergence};
use crate::traits::{Fit, Transformer};
use crate::whitening::{whiten, Whitening};
use crate::{Float, ParamGuard};

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, IcaError> for IcaValidParams<F> {
    type Object = Ica<F>;

    /// Fit the model on observations of shape (channels, samples)
    ///
    /// # Errors
    ///
    /// If the number of components is greater than the number of channels
    ///
    /// [`IcaError::DegenerateInput`] if the observations cannot be whitened, refer to
    /// [`whiten`]
    ///
    /// [`IcaError::SingularUnmixing`] if the assembled unmixing matrix is numerically singular
    fn fit(&self, observations: &ArrayBase<D, Ix2>) -> Result<Self::Object> {
        let nchannels = observations.nrows();

        // If the number of components is not set, every channel yields one
        let ncomponents = self.ncomponents().unwrap_or(nchannels);
        if ncomponents > nchannels {
            return Err(IcaError::InvalidValue(format!(
                "ncomponents cannot be greater than the number of channels {}, got {}",
                nchannels, ncomponents
            )));
        }

        let whitened = whiten(observations, ncomponents, self.eigen_floor())?;
        let rotation = self.estimate_rotation(&whitened.data)?;

        let model = Ica::assemble(
            whitened.whitening,
            rotation.w,
            rotation.convergence,
            self.compute_mixing(),
        )?;

        let sources = model.rotation.dot(&whitened.data);
        let model = Ica {
            kurtosis: kurtosis(&sources),
            ..model
        };

        tracing::info!(
            channels = nchannels,
            components = ncomponents,
            scheme = ?model.convergence.scheme(),
            iterations = model.convergence.iterations(),
            converged = model.convergence.converged(),
            "fitted ICA"
        );

        Ok(model)
    }
}

/// Fitted ICA model for recovering the sources
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Ica<F> {
    whitening: Whitening<F>,
    rotation: Array2<F>,
    components: Array2<F>,
    mixing: Option<Array2<F>>,
    convergence: Convergence<F>,
    kurtosis: Array1<F>,
}

impl<F: Float> Ica<F> {
    // U = W V and, on request, its pseudo-inverse A = V⁺ Wᵗ
    fn assemble(
        whitening: Whitening<F>,
        rotation: Array2<F>,
        convergence: Convergence<F>,
        compute_mixing: bool,
    ) -> Result<Self> {
        let components = rotation.dot(whitening.matrix());
        let (rows, cols) = components.dim();
        let singular = |condition: f64| IcaError::SingularUnmixing {
            rows,
            cols,
            condition,
        };

        // A = V⁺ Wᵗ only inverts U while W stays orthonormal
        let ortho_tol = F::epsilon().sqrt() * F::cast(rotation.nrows());
        if !(orthogonality_error(&rotation) <= ortho_tol) {
            let (eigenvalues, _) = eigh_descending(&rotation.dot(&rotation.t()))?;
            let smallest = eigenvalues[eigenvalues.len() - 1];
            let condition = if smallest > F::zero() {
                as_f64((eigenvalues[0] / smallest).sqrt() * whitening.condition().sqrt())
            } else {
                f64::INFINITY
            };
            return Err(singular(condition));
        }

        let condition = as_f64(whitening.condition().sqrt());
        if !condition.is_finite() || components.iter().any(|x| !x.is_finite()) {
            return Err(singular(condition));
        }

        let mixing = if compute_mixing {
            let mixing = whitening.dewhitening().dot(&rotation.t());
            if mixing.iter().any(|x| !x.is_finite()) {
                return Err(singular(condition));
            }
            Some(mixing)
        } else {
            None
        };

        Ok(Ica {
            whitening,
            rotation,
            components,
            mixing,
            convergence,
            kurtosis: Array1::zeros(0),
        })
    }

    /// Unmixing matrix `U`, components x channels
    pub fn unmixing(&self) -> &Array2<F> {
        &self.components
    }

    /// Mixing estimate `A`, the pseudo-inverse of the unmixing matrix, channels x components
    pub fn mixing(&self) -> Option<&Array2<F>> {
        self.mixing.as_ref()
    }

    /// Orthogonal rotation `W` of the whitened space
    pub fn rotation(&self) -> &Array2<F> {
        &self.rotation
    }

    pub fn whitening(&self) -> &Whitening<F> {
        &self.whitening
    }

    /// Per-channel mean removed before unmixing
    pub fn mean(&self) -> &Array1<F> {
        self.whitening.mean()
    }

    pub fn ncomponents(&self) -> usize {
        self.components.nrows()
    }

    pub fn convergence(&self) -> &Convergence<F> {
        &self.convergence
    }

    /// Excess kurtosis of each component on the fitted observations
    pub fn kurtosis(&self) -> &Array1<F> {
        &self.kurtosis
    }

    /// Sub- or super-Gaussian classification of each component, after the sign of its excess
    /// kurtosis
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.kurtosis.iter().map(|&k| SourceKind::from_kurtosis(k)).collect()
    }

    /// Map recovered sources back into the observation space, `A S + mean`
    ///
    /// # Errors
    ///
    /// [`IcaError::MixingNotComputed`] when the model was fitted without the mixing estimate
    pub fn reconstruct<D: Data<Elem = F>>(&self, sources: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
        let mixing = self.mixing.as_ref().ok_or(IcaError::MixingNotComputed)?;
        assert_eq!(
            sources.nrows(),
            mixing.ncols(),
            "The number of sources must match the number of components."
        );

        Ok(mixing.dot(sources) + &self.mean().view().insert_axis(Axis(1)))
    }
}

impl<'a, F: Float, D: Data<Elem = F>> Transformer<&'a ArrayBase<D, Ix2>, Array2<F>> for Ica<F> {
    /// Recover the sources, `S = U (Y - mean)`
    fn transform(&self, x: &'a ArrayBase<D, Ix2>) -> Array2<F> {
        assert_eq!(
            x.nrows(),
            self.components.ncols(),
            "The number of channels must match the fitted model."
        );

        let xcentered = x - &self.mean().view().insert_axis(Axis(1));
        self.components.dot(&xcentered)
    }
}

/// Result of a separation run, the recovered sources and the model that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct Separation<F> {
    sources: Array2<F>,
    model: Ica<F>,
}

impl<F: Float> Separation<F> {
    /// Recovered sources `S`, components x samples
    pub fn sources(&self) -> &Array2<F> {
        &self.sources
    }

    /// Unmixing matrix `U`
    pub fn unmixing(&self) -> &Array2<F> {
        self.model.unmixing()
    }

    /// Mixing estimate `A`, when requested
    pub fn mixing(&self) -> Option<&Array2<F>> {
        self.model.mixing()
    }

    pub fn convergence(&self) -> &Convergence<F> {
        self.model.convergence()
    }

    pub fn model(&self) -> &Ica<F> {
        &self.model
    }

    /// Split into `(S, U, A)`
    pub fn into_parts(self) -> (Array2<F>, Array2<F>, Option<Array2<F>>) {
        (self.sources, self.model.components, self.model.mixing)
    }
}

/// Separate the observations `y` (channels x samples) into independent components
///
/// Fits an [`Ica`] model with the given hyperparameters and applies it to the same
/// observations.
///
/// ```
/// use linfa_bss::{ica, Ica};
/// use ndarray::{array, Array};
///
/// let t = Array::linspace(0., 20., 500);
/// let sources = ndarray::stack![
///     ndarray::Axis(0),
///     t.mapv(|x: f64| (2. * x).sin()),
///     t.mapv(|x: f64| if (3. * x).sin() > 0. { 1. } else { -1. })
/// ];
/// let observations = array![[1., 1.], [0.5, 2.]].dot(&sources);
///
/// let separation = ica(&observations, &Ica::params().random_state(42)).unwrap();
/// let (s, u, a) = separation.into_parts();
///
/// assert_eq!(s.dim(), (2, 500));
/// assert_eq!(u.dim(), (2, 2));
/// assert!(a.is_some());
/// ```
pub fn ica<F: Float, D: Data<Elem = F>>(
    y: &ArrayBase<D, Ix2>,
    params: &IcaParams<F>,
) -> Result<Separation<F>> {
    let model = params.check_ref()?.fit(y)?;
    let sources = model.transform(y);

    Ok(Separation { sources, model })
}
