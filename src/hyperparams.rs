use ndarray::Array2;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::{contrast::GFunc, error::IcaError, unmixing::Ica, Float, ParamGuard};

/// How the rows of the rotation matrix are kept orthonormal
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orthogonalization {
    /// All directions are updated together and the whole matrix is re-orthonormalized after
    /// every sweep with `W <- (W Wᵗ)^{-1/2} W`. No direction is favoured over the others.
    Symmetric,
    /// Directions are estimated one after the other, each one projected out of the space
    /// spanned by the directions found before it (Gram-Schmidt).
    Deflation,
}

impl Default for Orthogonalization {
    fn default() -> Self {
        Orthogonalization::Symmetric
    }
}

/// Independent Component Analysis (ICA) hyperparameters
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct IcaValidParams<F: Float> {
    ncomponents: Option<usize>,
    gfunc: GFunc,
    orthogonalization: Orthogonalization,
    max_iter: usize,
    max_sweeps: usize,
    tol: F,
    eigen_floor: F,
    random_state: Option<u64>,
    w_init: Option<Array2<F>>,
    compute_mixing: bool,
}

impl<F: Float> IcaValidParams<F> {
    pub fn ncomponents(&self) -> &Option<usize> {
        &self.ncomponents
    }

    pub fn gfunc(&self) -> &GFunc {
        &self.gfunc
    }

    pub fn orthogonalization(&self) -> Orthogonalization {
        self.orthogonalization
    }

    /// Iteration cap of a single direction in the deflation scheme
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Iteration cap of the symmetric scheme, counted in sweeps over all directions
    pub fn max_sweeps(&self) -> usize {
        self.max_sweeps
    }

    pub fn tol(&self) -> F {
        self.tol
    }

    pub fn eigen_floor(&self) -> F {
        self.eigen_floor
    }

    pub fn random_state(&self) -> &Option<u64> {
        &self.random_state
    }

    pub fn w_init(&self) -> Option<&Array2<F>> {
        self.w_init.as_ref()
    }

    pub fn compute_mixing(&self) -> bool {
        self.compute_mixing
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct IcaParams<F: Float>(IcaValidParams<F>);

impl<F: Float> Default for IcaParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Ica<F> {
    pub fn params() -> IcaParams<F> {
        IcaParams::new()
    }
}

impl<F: Float> IcaParams<F> {
    /// Create new ICA hyperparameters with default values
    ///
    /// * tanh contrast (`GFunc::Logcosh(1.)`)
    /// * symmetric orthogonalization
    /// * 200 iterations per direction, 1000 sweeps
    /// * tolerance `1e-6`, eigenvalue floor `1e-10` relative to the largest eigenvalue
    /// * the mixing estimate is computed
    pub fn new() -> Self {
        Self(IcaValidParams {
            ncomponents: None,
            gfunc: GFunc::default(),
            orthogonalization: Orthogonalization::default(),
            max_iter: 200,
            max_sweeps: 1000,
            tol: F::cast(1e-6),
            eigen_floor: F::cast(1e-10),
            random_state: None,
            w_init: None,
            compute_mixing: true,
        })
    }

    /// Set the number of components to use, if not set all channels are used
    pub fn ncomponents(mut self, ncomponents: usize) -> Self {
        self.0.ncomponents = Some(ncomponents);
        self
    }

    /// G function used in the approximation to neg-entropy, refer [`GFunc`]
    pub fn gfunc(mut self, gfunc: GFunc) -> Self {
        self.0.gfunc = gfunc;
        self
    }

    /// Choose between symmetric and deflationary orthogonalization
    pub fn orthogonalization(mut self, orthogonalization: Orthogonalization) -> Self {
        self.0.orthogonalization = orthogonalization;
        self
    }

    /// Set maximum number of iterations per direction (deflation scheme)
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.0.max_iter = max_iter;
        self
    }

    /// Set maximum number of sweeps over all directions (symmetric scheme)
    pub fn max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.0.max_sweeps = max_sweeps;
        self
    }

    /// Set tolerance on the change of a direction at each iteration
    pub fn tol(mut self, tol: F) -> Self {
        self.0.tol = tol;
        self
    }

    /// Set the floor, relative to the largest eigenvalue of the covariance, that eigenvalues
    /// are clamped to before inversion during whitening
    pub fn eigen_floor(mut self, eigen_floor: F) -> Self {
        self.0.eigen_floor = eigen_floor;
        self
    }

    /// Set seed for random number generator for reproducible results.
    pub fn random_state(mut self, random_state: u64) -> Self {
        self.0.random_state = Some(random_state);
        self
    }

    /// Start from a given rotation instead of a random one. It must be square with as many
    /// rows as components.
    pub fn w_init(mut self, w_init: Array2<F>) -> Self {
        self.0.w_init = Some(w_init);
        self
    }

    /// Whether to compute the mixing estimate (pseudo-inverse of the unmixing matrix)
    pub fn compute_mixing(mut self, compute_mixing: bool) -> Self {
        self.0.compute_mixing = compute_mixing;
        self
    }
}

impl<F: Float> ParamGuard for IcaParams<F> {
    type Checked = IcaValidParams<F>;
    type Error = IcaError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.tol < F::zero() || !self.0.tol.is_finite() {
            Err(IcaError::InvalidTolerance(
                self.0.tol.to_f32().unwrap_or(f32::NAN),
            ))
        } else if !(self.0.eigen_floor >= F::zero() && self.0.eigen_floor < F::one()) {
            Err(IcaError::InvalidEigenFloor(
                self.0.eigen_floor.to_f32().unwrap_or(f32::NAN),
            ))
        } else if self.0.max_iter == 0 {
            Err(IcaError::InvalidIterations("max_iter"))
        } else if self.0.max_sweeps == 0 {
            Err(IcaError::InvalidIterations("max_sweeps"))
        } else if self.0.ncomponents == Some(0) {
            Err(IcaError::InvalidValue(
                "ncomponents must be at least one".to_string(),
            ))
        } else if let Err(msg) = self.0.gfunc.validate() {
            Err(IcaError::InvalidValue(msg))
        } else {
            match &self.0.w_init {
                Some(w) if w.nrows() != w.ncols() => Err(IcaError::InvalidValue(format!(
                    "w_init must be square, got {}x{}",
                    w.nrows(),
                    w.ncols()
                ))),
                _ => Ok(&self.0),
            }
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = IcaParams::<f64>::new().check_unwrap();

        assert_eq!(params.gfunc(), &GFunc::Logcosh(1.));
        assert_eq!(params.orthogonalization(), Orthogonalization::Symmetric);
        assert_eq!(params.max_iter(), 200);
        assert_eq!(params.max_sweeps(), 1000);
        assert_eq!(params.tol(), 1e-6);
        assert_eq!(params.eigen_floor(), 1e-10);
        assert!(params.compute_mixing());
        assert!(params.ncomponents().is_none());
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let res = IcaParams::<f64>::new().tol(-1.).check();
        assert!(matches!(res, Err(IcaError::InvalidTolerance(_))));
    }

    #[test]
    fn eigen_floor_range() {
        assert!(IcaParams::<f64>::new().eigen_floor(1.).check().is_err());
        assert!(IcaParams::<f64>::new().eigen_floor(-1e-3).check().is_err());
        assert!(IcaParams::<f64>::new().eigen_floor(0.).check().is_ok());
    }

    #[test]
    fn zero_iteration_caps_are_rejected() {
        assert!(matches!(
            IcaParams::<f64>::new().max_iter(0).check(),
            Err(IcaError::InvalidIterations("max_iter"))
        ));
        assert!(matches!(
            IcaParams::<f64>::new().max_sweeps(0).check(),
            Err(IcaError::InvalidIterations("max_sweeps"))
        ));
    }

    #[test]
    fn logcosh_alpha_is_checked() {
        let res = IcaParams::<f64>::new().gfunc(GFunc::Logcosh(10.)).check();
        assert!(matches!(res, Err(IcaError::InvalidValue(_))));
    }

    #[test]
    fn w_init_must_be_square() {
        let res = IcaParams::<f64>::new()
            .w_init(Array2::zeros((2, 3)))
            .check();
        assert!(res.is_err());
    }
}
