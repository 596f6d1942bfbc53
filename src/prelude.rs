//! linfa-bss prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{IcaError, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::{Float, ParamGuard};

#[doc(no_inline)]
pub use crate::{ica, GFunc, Ica, IcaParams, IcaValidParams, Orthogonalization, Separation};

#[doc(no_inline)]
pub use crate::{Convergence, NonConvergenceWarning};

#[doc(no_inline)]
pub use crate::metrics::{amari_distance, match_sources, SourceKind};
