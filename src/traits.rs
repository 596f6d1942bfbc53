//! Traits shared by the hyperparameter sets and the fitted model
//!

/// Fittable algorithms
///
/// A model is fitted on a batch of observations and the resulting object captures everything
/// learned from them. The error type is part of the trait so that hyperparameter checking and
/// numerical failures travel through the same `Result`.
pub trait Fit<R, E: std::error::Error> {
    type Object;

    fn fit(&self, records: &R) -> Result<Self::Object, E>;
}

/// Transformation of observations
///
/// Applies a fitted linear map to new records, producing a new representation of them.
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}
