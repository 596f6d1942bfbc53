//! Floating point bound shared by every stage of the engine
use ndarray::NdFloat;

#[cfg(feature = "blas")]
use ndarray_linalg::{Lapack, Scalar};

use num_traits::{FromPrimitive, NumCast, Signed};

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. Observations, whitening and rotation
/// matrices as well as the recovered sources all share the same element type.
pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Signed
    + Sum
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + approx::AbsDiffEq<Epsilon = Self>
{
    #[cfg(feature = "blas")]
    type Lapack: Float + Scalar + Lapack;
    #[cfg(not(feature = "blas"))]
    type Lapack: Float;

    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {
    type Lapack = f32;
}

impl Float for f64 {
    type Lapack = f64;
}
