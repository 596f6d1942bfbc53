//! # Blind source separation with Independent Component Analysis (ICA)
//!
//! `linfa-bss` recovers statistically independent source signals from linear mixtures of
//! them, without knowing the mixing process.
//!
//! Observations are laid out as (channels, samples). Each channel is one sensor, for
//! example a microphone or an electrode, and records a weighted sum of the sources:
//!
//! ```text
//! Y = M S
//! ```
//!
//! The engine estimates an unmixing matrix `U` such that `U (Y - mean)` yields the sources,
//! up to their order, sign and scale which cannot be identified.
//!
//! ## Pipeline
//!
//! 1. The observations are centered and whitened through an eigen-decomposition of their
//!    covariance, see [`whitening`].
//! 2. A fixed-point iteration searches the rotation of the whitened space that maximizes
//!    non-Gaussianity, measured through one of the [`GFunc`] contrast functions.
//! 3. After every update the rotation is kept orthonormal, either symmetrically or by
//!    deflation, see [`Orthogonalization`].
//! 4. The rotation and the whitening matrix are composed into `U`, and optionally its
//!    pseudo-inverse `A` is computed as an estimate of the mixing matrix.
//!
//! ## Example
//!
//! ```
//! use linfa_bss::prelude::*;
//! use ndarray::{array, Array, Axis};
//!
//! let t = Array::linspace(0., 10., 1000);
//! let sources = ndarray::stack![
//!     Axis(0),
//!     t.mapv(|x: f64| (3. * x).sin()),
//!     t.mapv(|x: f64| x - x.floor())
//! ];
//! let observations = array![[1., 0.5], [0.7, 1.3]].dot(&sources);
//!
//! let model = Ica::params().random_state(7).fit(&observations).unwrap();
//! let recovered = model.transform(&observations);
//!
//! assert_eq!(recovered.dim(), (2, 1000));
//! ```
//!
//! Runs that exhaust their iteration budget still return the best estimate found. The
//! [`Convergence`] report carries a [`NonConvergenceWarning`] in that case, which is also
//! emitted as a `tracing` event.

pub mod contrast;
pub mod error;
mod float;
pub mod hyperparams;
mod linalg;
pub mod metrics;
mod optimizer;
pub mod orthogonal;
mod param_guard;
pub mod prelude;
pub mod traits;
pub mod unmixing;
pub mod whitening;

pub use contrast::GFunc;
pub use error::{IcaError, Result};
pub use float::Float;
pub use hyperparams::{IcaParams, IcaValidParams, Orthogonalization};
pub use orthogonal::{Convergence, NonConvergenceWarning};
pub use param_guard::ParamGuard;
pub use unmixing::{ica, Ica, Separation};
pub use whitening::Whitening;
