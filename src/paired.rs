//! Two responses observed on the same individuals.
//!
//! Here there is a single population with one score and one weight per
//! individual, but two responses (say, two survey questions). The
//! deviation between the responses is accumulated directly, block by block
//! of tied scores; no interpolation is needed since both responses are
//! observed at every score.

use tracing::debug;

use crate::cumulative::{CumulativeCurve, CumulativeOptions, Increments};
use crate::error::{Error, Result};
use crate::observation::Subpopulation;
use crate::stats::{self, WeightedMean};

/// Paired responses on a shared, sorted score/weight design.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSample {
    first: Subpopulation,
    second: Subpopulation,
}

impl PairedSample {
    /// Builds a paired sample.
    ///
    /// Scores must be non-decreasing; ties are allowed.
    ///
    /// # Errors
    /// - As [`Subpopulation::new`] for either response column.
    /// - [`Error::NotSorted`] if scores decrease anywhere.
    pub fn new(
        first: &[f64],
        second: &[f64],
        scores: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Self> {
        let first = Subpopulation::new(first, scores, weights)?;
        stats::check_non_decreasing(first.scores())?;
        let second = first.with_responses(second)?;
        Ok(Self { first, second })
    }

    /// Number of individuals.
    pub fn len(&self) -> usize {
        self.first.len()
    }

    /// Whether the sample is empty.
    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Scores, weights, and the first response.
    pub fn first(&self) -> &Subpopulation {
        &self.first
    }

    /// Scores, weights, and the second response.
    pub fn second(&self) -> &Subpopulation {
        &self.second
    }
}

/// Cumulative differences "first response minus second response".
///
/// Each block of tied scores contributes its weighted average difference,
/// weighted by the block's share of the total weight. The length scale is
/// `sqrt(Σ Δa² (w_k + w_{k+1})² / 8)` over the blocks.
///
/// # Errors
/// - [`Error::EmptyInput`] for an empty sample.
/// - [`Error::InvalidFraction`] for a fraction outside `(0, 1]`.
///
/// # Examples
/// ```
/// use u_subpop::paired::{cumulative, PairedSample};
///
/// let sample = PairedSample::new(&[1.0, 1.0, 0.0], &[0.0, 1.0, 0.0], &[0.1, 0.2, 0.3], None).unwrap();
/// let curve = cumulative(&sample, 1.0).unwrap();
/// assert!((curve.terminal() - 1.0 / 3.0).abs() < 1e-15);
/// ```
pub fn cumulative(sample: &PairedSample, fraction: f64) -> Result<CumulativeCurve> {
    CumulativeOptions::default().with_fraction(fraction).validate()?;
    if sample.is_empty() {
        return Err(Error::EmptyInput("paired sample"));
    }
    let s = sample.first.scores();
    let r0 = sample.first.responses();
    let r1 = sample.second.responses();
    let w = sample.first.weights();

    let mut diffs = Vec::new();
    let mut weights = Vec::new();
    let mut scores = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut block = WeightedMean::new();
        let mut end = start;
        while end < s.len() && s[end] == s[start] {
            block.update(r0[end] - r1[end], w[end]);
            end += 1;
        }
        diffs.push(block.mean_or_nan());
        weights.push(block.total_weight());
        scores.push(s[start]);
        start = end;
    }

    let blocks = diffs.len();
    let inc = Increments {
        diffs,
        weights,
        scores,
    }
    .truncate(fraction, "paired score blocks")?;
    let length_scale = (inc.second_difference_energy() / 8.0).sqrt();
    debug!(
        n = sample.len(),
        blocks,
        length_scale,
        "cumulative differences between paired responses"
    );
    Ok(inc.into_curve(length_scale))
}

/// Weighted mean of "first response minus second response".
///
/// # Errors
/// [`Error::EmptyInput`] for an empty sample.
pub fn ate(sample: &PairedSample) -> Result<f64> {
    let mut acc = WeightedMean::new();
    for (k, &wk) in sample.first.weights().iter().enumerate() {
        acc.update(sample.first.responses()[k] - sample.second.responses()[k], wk);
    }
    acc.mean().ok_or(Error::EmptyInput("paired sample"))
}
