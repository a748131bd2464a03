//! Reliability-diagram binning.
//!
//! Two ways of cutting a score-sorted subpopulation into contiguous bins:
//!
//! - [`equiscore`]: bins of equal width in score. Every requested bin is
//!   reported, including empty ones.
//! - [`equierr`]: bins of roughly equal statistical error, grown until each
//!   holds a target effective sample size. The target is estimated from a
//!   random sample of the weights, so the caller supplies the generator.
//!
//! Each bin reports the weighted average score and response and its total
//! weight. The `_pair` variants bin two subpopulations on a common weight
//! scale (weights normalized jointly to total 1) for overlaid diagrams.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::observation::Subpopulation;
use crate::random;
use crate::stats::{self, WeightedMean};

/// Summary of one bin.
///
/// Empty bins have zero weight and `NaN` averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSummary {
    /// Weighted average score.
    pub score: f64,
    /// Weighted average response.
    pub response: f64,
    /// Total weight.
    pub weight: f64,
    /// Half-open range of positions covered.
    pub start: usize,
    pub end: usize,
}

impl BinSummary {
    /// Number of observations in the bin.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the bin holds no observations.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Bins built by [`equierr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquierrBins {
    /// Bin boundaries: bin `k` covers `bounds[k]..bounds[k + 1]`.
    pub bounds: Vec<usize>,
    pub summaries: Vec<BinSummary>,
}

impl EquierrBins {
    /// Number of bins constructed.
    pub fn count(&self) -> usize {
        self.summaries.len()
    }
}

/// Borrowed columns with the weights a binning should use.
struct Columns<'a> {
    responses: &'a [f64],
    scores: &'a [f64],
    weights: &'a [f64],
}

impl<'a> Columns<'a> {
    fn new(sub: &'a Subpopulation, weights: &'a [f64]) -> Self {
        Self {
            responses: sub.responses(),
            scores: sub.scores(),
            weights,
        }
    }

    fn len(&self) -> usize {
        self.scores.len()
    }

    fn summarize(&self, start: usize, end: usize) -> BinSummary {
        let mut score = WeightedMean::new();
        let mut response = WeightedMean::new();
        for k in start..end {
            score.update(self.scores[k], self.weights[k]);
            response.update(self.responses[k], self.weights[k]);
        }
        BinSummary {
            score: score.mean_or_nan(),
            response: response.mean_or_nan(),
            weight: score.total_weight(),
            start,
            end,
        }
    }

    fn summarize_bounds(&self, bounds: &[usize]) -> Vec<BinSummary> {
        bounds
            .windows(2)
            .map(|b| self.summarize(b[0], b[1]))
            .collect()
    }
}

fn check_inputs(sub: &Subpopulation, nbins: usize) -> Result<()> {
    if nbins == 0 {
        return Err(Error::InvalidBinCount);
    }
    if sub.is_empty() {
        return Err(Error::EmptyInput("subpopulation"));
    }
    stats::check_non_decreasing(sub.scores())
}

// ---------------------------------------------------------------------------
// Equal width in score
// ---------------------------------------------------------------------------

/// Bins of equal width over `[min score, max score]`.
///
/// Bin `j` holds the scores in `(min + j·h, min + (j+1)·h]` with
/// `h = (max − min) / nbins`; bin 0 also holds `min`. When all scores are
/// equal, everything lands in bin 0. Exactly `nbins` summaries are returned.
///
/// # Errors
/// - [`Error::InvalidBinCount`] if `nbins == 0`.
/// - [`Error::EmptyInput`] for an empty subpopulation.
/// - [`Error::NotSorted`] if scores decrease anywhere.
///
/// # Examples
/// ```
/// use u_subpop::binning::equiscore;
/// use u_subpop::observation::Subpopulation;
///
/// let sub = Subpopulation::new(&[0.0, 0.0, 1.0, 1.0, 1.0], &[0.0, 1.0, 2.0, 3.0, 4.0], None).unwrap();
/// let bins = equiscore(&sub, 2).unwrap();
/// assert_eq!(bins.len(), 2);
/// assert_eq!((bins[0].start, bins[0].end), (0, 3));
/// assert_eq!(bins[1].response, 1.0);
/// ```
pub fn equiscore(sub: &Subpopulation, nbins: usize) -> Result<Vec<BinSummary>> {
    check_inputs(sub, nbins)?;
    Ok(equiscore_columns(&Columns::new(sub, sub.weights()), nbins))
}

fn equiscore_columns(cols: &Columns<'_>, nbins: usize) -> Vec<BinSummary> {
    let s = cols.scores;
    let n = cols.len();
    let lo = s[0];
    let width = (s[n - 1] - lo) / nbins as f64;

    let mut bounds = Vec::with_capacity(nbins + 1);
    bounds.push(0);
    for j in 1..nbins {
        let edge = lo + j as f64 * width;
        bounds.push(s.partition_point(|&x| x <= edge));
    }
    bounds.push(n);

    let summaries = cols.summarize_bounds(&bounds);
    let empty = summaries.iter().filter(|b| b.is_empty()).count();
    debug!(nbins, width, empty, "equal-width score bins");
    summaries
}

// ---------------------------------------------------------------------------
// Equal error
// ---------------------------------------------------------------------------

/// Bins with roughly equal ratio `‖w‖₂ / ‖w‖₁`.
///
/// # Algorithm
/// 1. Draw `max(1, n / nbins)` weights uniformly without replacement and
///    set the threshold `t = Σv² / (Σv)²` over them. For equal weights this
///    is `nbins / n`.
/// 2. Grow each bin from the first unassigned position until its own
///    `‖w‖₂² / ‖w‖₁²` is at most `t` (its effective sample size reaches
///    `1/t`) or the data run out. A bin that would leave exactly one
///    position behind takes that position too.
/// 3. If the final bin has fewer than half the positions of the bin before
///    it, merge the two.
///
/// The number of bins constructed may differ from `nbins` when weights
/// vary. The bins always partition `0..n`, and the same generator state
/// gives the same bins.
///
/// # Errors
/// - [`Error::InvalidBinCount`] if `nbins == 0`.
/// - [`Error::EmptyInput`] for an empty subpopulation.
/// - [`Error::NotSorted`] if scores decrease anywhere.
///
/// # Examples
/// ```
/// use u_subpop::binning::equierr;
/// use u_subpop::observation::Subpopulation;
/// use u_subpop::random::create_rng;
///
/// let scores: Vec<f64> = (0..100).map(|k| k as f64 / 100.0).collect();
/// let sub = Subpopulation::new(&vec![0.5; 100], &scores, None).unwrap();
/// let bins = equierr(&sub, 10, &mut create_rng(1)).unwrap();
/// assert_eq!(bins.count(), 10);
/// ```
pub fn equierr<R: Rng>(sub: &Subpopulation, nbins: usize, rng: &mut R) -> Result<EquierrBins> {
    check_inputs(sub, nbins)?;
    Ok(equierr_columns(&Columns::new(sub, sub.weights()), nbins, rng))
}

fn equierr_columns<R: Rng>(cols: &Columns<'_>, nbins: usize, rng: &mut R) -> EquierrBins {
    let w = cols.weights;
    let n = w.len();
    let proxy = (n / nbins).max(1);
    let sample: Vec<f64> = random::sorted_sample(n, proxy, rng)
        .into_iter()
        .map(|k| w[k])
        .collect();
    let threshold = stats::concentration(&sample);

    let mut bounds = vec![0];
    let mut start = 0;
    while start < n {
        let mut end = start;
        let (mut l1, mut l2) = (0.0, 0.0);
        loop {
            l1 += w[end];
            l2 += w[end] * w[end];
            end += 1;
            if l2 / (l1 * l1) <= threshold || end == n {
                break;
            }
        }
        // A single leftover position never opens a bin of its own.
        if end == n - 1 {
            end = n;
        }
        bounds.push(end);
        start = end;
    }

    let k = bounds.len();
    if k >= 3 {
        let last = bounds[k - 1] - bounds[k - 2];
        let previous = bounds[k - 2] - bounds[k - 3];
        if 2 * last < previous {
            bounds.remove(k - 2);
        }
    }

    let summaries = cols.summarize_bounds(&bounds);
    debug!(
        requested = nbins,
        constructed = summaries.len(),
        threshold,
        "equal-error bins"
    );
    EquierrBins { bounds, summaries }
}

// ---------------------------------------------------------------------------
// Two subpopulations on a common scale
// ---------------------------------------------------------------------------

/// [`equiscore`] for two subpopulations with jointly normalized weights.
///
/// Bin weights across both results sum to 1.
pub fn equiscore_pair(
    first: &Subpopulation,
    second: &Subpopulation,
    nbins: usize,
) -> Result<[Vec<BinSummary>; 2]> {
    check_inputs(first, nbins)?;
    check_inputs(second, nbins)?;
    let (w0, w1) = stats::normalize_jointly(first.weights(), second.weights());
    let bins = [
        equiscore_columns(&Columns::new(first, &w0), nbins),
        equiscore_columns(&Columns::new(second, &w1), nbins),
    ];
    if bins.iter().flatten().all(|b| b.is_empty()) {
        warn!(nbins, "every equal-width bin is empty");
    }
    Ok(bins)
}

/// [`equierr`] for two subpopulations with jointly normalized weights.
///
/// The generator is consumed for `first` and then for `second`, so the
/// bin counts match two successive [`equierr`] calls on the same stream.
pub fn equierr_pair<R: Rng>(
    first: &Subpopulation,
    second: &Subpopulation,
    nbins: usize,
    rng: &mut R,
) -> Result<[EquierrBins; 2]> {
    check_inputs(first, nbins)?;
    check_inputs(second, nbins)?;
    let (w0, w1) = stats::normalize_jointly(first.weights(), second.weights());
    let a = equierr_columns(&Columns::new(first, &w0), nbins, rng);
    let b = equierr_columns(&Columns::new(second, &w1), nbins, rng);
    Ok([a, b])
}
