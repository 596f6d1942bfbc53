//! Evaluation helpers for separation results
//!
//! ICA recovers sources only up to permutation, sign and scale, so every comparison against
//! reference signals or a known mixing matrix in this module is invariant to those.
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::Float;

/// Above this many components the optimal matching is approximated greedily
const EXACT_MATCHING_LIMIT: usize = 8;

/// Shape of a source distribution relative to the Gaussian
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Negative excess kurtosis: flat or bimodal, like uniform noise or square waves
    SubGaussian,
    /// Non-negative excess kurtosis: peaked and heavy tailed, like speech or sparse signals
    SuperGaussian,
}

impl SourceKind {
    pub fn from_kurtosis<F: Float>(kurtosis: F) -> Self {
        if kurtosis < F::zero() {
            SourceKind::SubGaussian
        } else {
            SourceKind::SuperGaussian
        }
    }
}

/// Excess kurtosis `m4 / m2² - 3` of every row
pub fn kurtosis<F: Float, D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>) -> Array1<F> {
    x.map_axis(Axis(1), |row| {
        let n = F::cast(row.len().max(1));
        let mean = row.sum() / n;
        let m2 = row.iter().map(|&v| (v - mean).powi(2)).sum::<F>() / n;
        let m4 = row.iter().map(|&v| (v - mean).powi(4)).sum::<F>() / n;
        if m2 > F::zero() {
            m4 / m2.powi(2) - F::cast(3.)
        } else {
            F::zero()
        }
    })
}

/// Amari distance between an unmixing estimate `w` and a known mixing matrix `a`
///
/// It measures how far `W A` is from a scaled permutation matrix and equals zero for a
/// perfect separation.
pub fn amari_distance<F, D1, D2>(w: &ArrayBase<D1, Ix2>, a: &ArrayBase<D2, Ix2>) -> F
where
    F: Float,
    D1: Data<Elem = F>,
    D2: Data<Elem = F>,
{
    let p = w.dot(a).mapv(|x| x.powi(2));
    let n = F::cast(p.nrows());

    let spread = |r: &Array2<F>| -> F {
        r.outer_iter()
            .map(|row| {
                let total = row.sum();
                let largest = row.iter().cloned().fold(F::zero(), |a, b| a.max(b));
                if largest > F::zero() {
                    total / largest - F::one()
                } else {
                    F::zero()
                }
            })
            .sum()
    };

    (spread(&p) + spread(&p.t().to_owned())) / (F::cast(2.) * n)
}

/// Absolute Pearson correlation between every row of `a` and every row of `b`
pub fn cross_correlation<F, D1, D2>(a: &ArrayBase<D1, Ix2>, b: &ArrayBase<D2, Ix2>) -> Array2<F>
where
    F: Float,
    D1: Data<Elem = F>,
    D2: Data<Elem = F>,
{
    assert_eq!(
        a.ncols(),
        b.ncols(),
        "Both signal sets must have the same number of samples."
    );

    standardize(a).dot(&standardize(b).t()).mapv(|x| x.abs())
}

// zero mean and unit norm rows
fn standardize<F: Float, D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>) -> Array2<F> {
    let mut x = x.to_owned();
    for mut row in x.outer_iter_mut() {
        let n = F::cast(row.len().max(1));
        let mean = row.sum() / n;
        row.mapv_inplace(|v| v - mean);
        let norm = row.dot(&row).sqrt();
        if norm > F::zero() {
            row.mapv_inplace(|v| v / norm);
        }
    }
    x
}

/// Assignment of estimated sources to reference sources
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMatching<F> {
    assignment: Vec<usize>,
    correlations: Array1<F>,
}

impl<F: Float> SourceMatching<F> {
    /// `assignment()[i]` is the estimated row matched with reference row `i`
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Absolute correlation of each matched pair, indexed by reference row
    pub fn correlations(&self) -> &Array1<F> {
        &self.correlations
    }

    /// Weakest matched pair
    pub fn min_correlation(&self) -> F {
        self.correlations
            .iter()
            .cloned()
            .fold(F::infinity(), |a, b| a.min(b))
    }
}

/// Match estimated sources against reference signals, maximizing the summed absolute
/// correlation over all one-to-one assignments
///
/// Both inputs are (signals x samples). The search is exhaustive for up to eight reference
/// signals and greedy beyond. Every reference row must be matched, so `estimated` needs at
/// least as many rows as `reference`.
pub fn match_sources<F, D1, D2>(
    estimated: &ArrayBase<D1, Ix2>,
    reference: &ArrayBase<D2, Ix2>,
) -> SourceMatching<F>
where
    F: Float,
    D1: Data<Elem = F>,
    D2: Data<Elem = F>,
{
    assert!(
        estimated.nrows() >= reference.nrows(),
        "Need at least as many estimated sources as reference signals."
    );

    // rows are reference signals, columns estimated ones
    let corr = cross_correlation(reference, estimated);

    let assignment = if corr.nrows() <= EXACT_MATCHING_LIMIT {
        exact_assignment(&corr)
    } else {
        greedy_assignment(&corr)
    };

    let correlations = assignment
        .iter()
        .enumerate()
        .map(|(i, &j)| corr[[i, j]])
        .collect();

    SourceMatching {
        assignment,
        correlations,
    }
}

fn exact_assignment<F: Float>(corr: &Array2<F>) -> Vec<usize> {
    fn search<F: Float>(
        corr: &Array2<F>,
        row: usize,
        used: &mut Vec<bool>,
        current: &mut Vec<usize>,
        score: F,
        best: &mut (F, Vec<usize>),
    ) {
        if row == corr.nrows() {
            if score > best.0 {
                *best = (score, current.clone());
            }
            return;
        }
        for col in 0..corr.ncols() {
            if used[col] {
                continue;
            }
            used[col] = true;
            current.push(col);
            search(corr, row + 1, used, current, score + corr[[row, col]], best);
            current.pop();
            used[col] = false;
        }
    }

    let mut best = (F::neg_infinity(), (0..corr.nrows()).collect());
    search(
        corr,
        0,
        &mut vec![false; corr.ncols()],
        &mut Vec::with_capacity(corr.nrows()),
        F::zero(),
        &mut best,
    );

    best.1
}

fn greedy_assignment<F: Float>(corr: &Array2<F>) -> Vec<usize> {
    let mut assignment = vec![usize::MAX; corr.nrows()];
    let mut used_rows = vec![false; corr.nrows()];
    let mut used_cols = vec![false; corr.ncols()];

    for _ in 0..corr.nrows() {
        let mut best = (F::neg_infinity(), 0, 0);
        for ((i, j), &c) in corr.indexed_iter() {
            if !used_rows[i] && !used_cols[j] && c > best.0 {
                best = (c, i, j);
            }
        }
        let (_, i, j) = best;
        assignment[i] = j;
        used_rows[i] = true;
        used_cols[j] = true;
    }

    assignment
}
