//! Weighted accumulation, normalization, and ordering checks.
//!
//! These are the small numerical building blocks every comparison shares:
//! compensated sums for weight totals, a weighted running mean for bins and
//! runs, and the monotonicity checks that guard sorted inputs.
//!
//! # Algorithms
//!
//! - **Totals**: Neumaier compensated summation, so normalizing millions of
//!   survey weights does not drift.
//! - **Weighted mean**: running `Σ w·x` and `Σ w`, mergeable across chunks.

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Kahan compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// This is an improved variant of Kahan summation that also handles the
/// case where the addend is larger in magnitude than the running sum.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Examples
/// ```
/// use u_subpop::stats::kahan_sum;
/// let v = vec![0.1; 10];
/// assert!((kahan_sum(&v) - 1.0).abs() < 1e-15);
/// ```
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

/// Running sums of `data`.
pub fn cumsum(data: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    data.iter()
        .map(|&x| {
            acc += x;
            acc
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Weighted mean accumulator
// ---------------------------------------------------------------------------

/// Streaming weighted mean.
///
/// Keeps `Σ w·x` and `Σ w`. An accumulator that has seen no weight has no
/// mean; callers reporting bins turn that into a `NaN` sentinel.
///
/// # Examples
/// ```
/// use u_subpop::stats::WeightedMean;
/// let mut acc = WeightedMean::new();
/// acc.update(1.0, 3.0);
/// acc.update(0.0, 1.0);
/// assert!((acc.mean().unwrap() - 0.75).abs() < 1e-15);
/// assert_eq!(acc.total_weight(), 4.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedMean {
    weighted_sum: f64,
    weight: f64,
    count: usize,
}

impl WeightedMean {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` with weight `weight`.
    pub fn update(&mut self, value: f64, weight: f64) {
        self.weighted_sum += value * weight;
        self.weight += weight;
        self.count += 1;
    }

    /// Number of values added.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Total weight added.
    pub fn total_weight(&self) -> f64 {
        self.weight
    }

    /// Weighted mean, or `None` if no weight has been added.
    pub fn mean(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some(self.weighted_sum / self.weight)
        } else {
            None
        }
    }

    /// Weighted mean, or `NaN` if no weight has been added.
    pub fn mean_or_nan(&self) -> f64 {
        self.mean().unwrap_or(f64::NAN)
    }

    /// Merges another accumulator into this one.
    pub fn merge(&mut self, other: &WeightedMean) {
        self.weighted_sum += other.weighted_sum;
        self.weight += other.weight;
        self.count += other.count;
    }
}

// ---------------------------------------------------------------------------
// Validation and normalization
// ---------------------------------------------------------------------------

/// Checks that every weight is positive and finite.
///
/// # Errors
/// [`Error::InvalidWeight`] naming the first offending entry.
pub fn validate_weights(weights: &[f64]) -> Result<()> {
    match weights
        .iter()
        .position(|&w| !(w.is_finite() && w > 0.0))
    {
        Some(index) => Err(Error::InvalidWeight {
            index,
            value: weights[index],
        }),
        None => Ok(()),
    }
}

/// Checks that `data` is strictly increasing.
///
/// # Errors
/// [`Error::NotSorted`] at the first index `k` with `data[k] >= data[k + 1]`.
pub fn check_strictly_increasing(data: &[f64]) -> Result<()> {
    match data.windows(2).position(|p| p[0] >= p[1]) {
        Some(index) => Err(Error::NotSorted {
            index,
            required: "strictly increasing",
        }),
        None => Ok(()),
    }
}

/// Checks that `data` is non-decreasing.
///
/// # Errors
/// [`Error::NotSorted`] at the first index `k` with `data[k] > data[k + 1]`.
pub fn check_non_decreasing(data: &[f64]) -> Result<()> {
    match data.windows(2).position(|p| p[0] > p[1]) {
        Some(index) => Err(Error::NotSorted {
            index,
            required: "non-decreasing",
        }),
        None => Ok(()),
    }
}

/// Scales `weights` to sum to 1.
///
/// Weights are assumed validated (positive), so the total is positive
/// whenever `weights` is non-empty.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total = kahan_sum(weights);
    weights.iter().map(|&w| w / total).collect()
}

/// Scales two weight vectors by their combined total, so that together
/// they sum to 1.
pub fn normalize_jointly(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total = kahan_sum(a) + kahan_sum(b);
    (
        a.iter().map(|&w| w / total).collect(),
        b.iter().map(|&w| w / total).collect(),
    )
}

/// Ratio `‖w‖₂² / ‖w‖₁²` for positive weights.
///
/// Equals `1/n` for `n` equal weights; its reciprocal is the effective
/// sample size.
pub fn concentration(weights: &[f64]) -> f64 {
    let l1: f64 = weights.iter().sum();
    let l2: f64 = weights.iter().map(|w| w * w).sum();
    l2 / (l1 * l1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
