//! Cumulative differences between subpopulations.
//!
//! The deviation between two subpopulations is read off a curve: the
//! running, weight-normalized sum of local response differences, plotted
//! against cumulative weight. A slope on the curve is a deviation over that
//! range of scores; the Kuiper and Kolmogorov–Smirnov statistics summarize
//! the whole curve, and the length scale gives the size of purely random
//! fluctuations so the statistics can be standardized.
//!
//! # Modes
//!
//! - [`disjoint`]: two subpopulations whose scores never coincide. Responses
//!   are paired across neighbouring runs of the merged score sequence, with
//!   each difference interpolated symmetrically between the runs on either
//!   side.
//! - [`versus_population`]: one subpopulation against the full population it
//!   was drawn from. Differences are taken at shared (possibly tied) scores.
//!
//! Both orient differences consistently, so swapping the two sides negates
//! the curve exactly.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::distributions::{KolmogorovSmirnov, Kuiper};
use crate::error::{Error, Result};
use crate::merge::WeightedMerge;
use crate::observation::Subpopulation;
use crate::stats::{self, WeightedMean};

/// Options shared by the cumulative modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativeOptions {
    /// Scores are success probabilities of Bernoulli responses; use the
    /// binomial variance bound for the length scale.
    #[serde(default)]
    pub probs: bool,
    /// Leading share of the curve to keep, in `(0, 1]`.
    #[serde(default = "CumulativeOptions::default_fraction")]
    pub fraction: f64,
}

impl CumulativeOptions {
    fn default_fraction() -> f64 {
        1.0
    }

    /// Sets whether scores are probabilities.
    pub fn with_probs(mut self, probs: bool) -> Self {
        self.probs = probs;
        self
    }

    /// Sets the leading share of the curve to keep.
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// # Errors
    /// [`Error::InvalidFraction`] unless `0 < fraction <= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.fraction > 0.0 && self.fraction <= 1.0 {
            Ok(())
        } else {
            Err(Error::InvalidFraction(self.fraction))
        }
    }
}

impl Default for CumulativeOptions {
    fn default() -> Self {
        Self {
            probs: false,
            fraction: Self::default_fraction(),
        }
    }
}

/// Summary statistics of a cumulative curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticResult {
    /// `max(C ∪ {0}) − min(C ∪ {0})`.
    pub kuiper: f64,
    /// `max |C|`.
    pub kolmogorov_smirnov: f64,
    /// Standard deviation scale of the curve under no deviation.
    pub length_scale: f64,
    /// Number of points on the (truncated) curve.
    pub sample_count: usize,
}

impl StatisticResult {
    /// Kuiper statistic divided by the length scale.
    pub fn standardized_kuiper(&self) -> f64 {
        self.kuiper / self.length_scale
    }

    /// Kolmogorov–Smirnov statistic divided by the length scale.
    pub fn standardized_kolmogorov_smirnov(&self) -> f64 {
        self.kolmogorov_smirnov / self.length_scale
    }

    /// Asymptotic p-value of the Kuiper statistic.
    pub fn kuiper_p_value(&self) -> f64 {
        Kuiper.sf(self.standardized_kuiper())
    }

    /// Asymptotic p-value of the Kolmogorov–Smirnov statistic.
    pub fn kolmogorov_smirnov_p_value(&self) -> f64 {
        KolmogorovSmirnov.sf(self.standardized_kolmogorov_smirnov())
    }
}

/// A cumulative-difference curve and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeCurve {
    /// Cumulative normalized weight; the last entry is 1.
    pub abscissae: Vec<f64>,
    /// Cumulative weighted differences.
    pub ordinates: Vec<f64>,
    /// Score labelling each point, for the horizontal axis.
    pub scores: Vec<f64>,
    pub statistics: StatisticResult,
}

impl CumulativeCurve {
    /// Number of points on the curve.
    pub fn len(&self) -> usize {
        self.ordinates.len()
    }

    /// Whether the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.ordinates.is_empty()
    }

    /// Final value of the curve: the weighted average difference.
    pub fn terminal(&self) -> f64 {
        self.ordinates.last().copied().unwrap_or(0.0)
    }
}

/// Weighted differences before accumulation.
pub(crate) struct Increments {
    pub(crate) diffs: Vec<f64>,
    pub(crate) weights: Vec<f64>,
    pub(crate) scores: Vec<f64>,
}

impl Increments {
    /// Keeps the leading `⌊len · fraction⌋` points and renormalizes their
    /// weights.
    pub(crate) fn truncate(mut self, fraction: f64, what: &'static str) -> Result<Self> {
        let keep = (self.diffs.len() as f64 * fraction) as usize;
        if keep == 0 {
            return Err(Error::InsufficientData {
                what,
                needed: 1,
                got: 0,
            });
        }
        self.diffs.truncate(keep);
        self.weights.truncate(keep);
        self.scores.truncate(keep);
        self.weights = stats::normalize(&self.weights);
        Ok(self)
    }

    /// `Σ (a_{k+1} − a_k)² (w_k + w_{k+1})²`.
    pub(crate) fn second_difference_energy(&self) -> f64 {
        self.diffs
            .windows(2)
            .zip(self.weights.windows(2))
            .map(|(a, w)| {
                let da = a[1] - a[0];
                let sw = w[0] + w[1];
                da * da * sw * sw
            })
            .sum()
    }

    pub(crate) fn into_curve(self, length_scale: f64) -> CumulativeCurve {
        let products: Vec<f64> = self
            .diffs
            .iter()
            .zip(&self.weights)
            .map(|(a, w)| a * w)
            .collect();
        let ordinates = stats::cumsum(&products);
        let abscissae = stats::cumsum(&self.weights);
        let (kuiper, kolmogorov_smirnov) = extremes(&ordinates);
        if length_scale.is_nan() || length_scale <= 0.0 {
            warn!(length_scale, "degenerate length scale; standardized statistics are not finite");
        }
        let statistics = StatisticResult {
            kuiper,
            kolmogorov_smirnov,
            length_scale,
            sample_count: ordinates.len(),
        };
        CumulativeCurve {
            abscissae,
            ordinates,
            scores: self.scores,
            statistics,
        }
    }
}

/// Kuiper and Kolmogorov–Smirnov statistics of a curve starting at 0.
fn extremes(ordinates: &[f64]) -> (f64, f64) {
    let hi = ordinates.iter().copied().fold(0.0_f64, f64::max);
    let lo = ordinates.iter().copied().fold(0.0_f64, f64::min);
    let abs_max = ordinates.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    (hi - lo, abs_max)
}

/// Cumulative differences between two subpopulations with disjoint scores.
///
/// The sign convention is "`first` minus `second`".
///
/// # Algorithm
/// 1. Merge the scores and split the merged sequence into maximal runs of
///    one origin; runs alternate between the subpopulations.
/// 2. For every window of three consecutive runs `(l, c, r)`, compare the
///    centre run with both neighbours: `((R_c − R_l) + (R_c − R_r)) / 2`,
///    signed so that subpopulation 0 comes first. The window weight is
///    `(ω_l + 2ω_c + ω_r) / 4` with `ω` the mean entry weight of a run.
/// 3. Accumulate over windows with weights normalized to sum to 1.
///
/// The length scale is `sqrt(Σ w² T (1 − T))` when scores are
/// probabilities, else `sqrt(Σ Δa² (w_k + w_{k+1})² / 16)`; either is then
/// scaled by `√2` for the dependence between neighbouring windows and by
/// `√2` again for comparing two independent subpopulations.
///
/// # Errors
/// - [`Error::NotSorted`] if either score sequence is not strictly increasing.
/// - [`Error::NotDisjoint`] if the subpopulations share a score.
/// - [`Error::InsufficientData`] if the merge has fewer than three runs.
/// - [`Error::InvalidFraction`] for a fraction outside `(0, 1]`.
///
/// # Examples
/// ```
/// use u_subpop::cumulative::{disjoint, CumulativeOptions};
/// use u_subpop::observation::Subpopulation;
///
/// let a = Subpopulation::new(&[1.0, 0.0, 1.0], &[1.0, 3.0, 5.0], None).unwrap();
/// let b = Subpopulation::new(&[0.0, 1.0, 0.0], &[2.0, 4.0, 6.0], None).unwrap();
/// let curve = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
/// assert_eq!(curve.statistics.sample_count, 4);
/// assert!(curve.terminal().abs() < 1e-12);
/// ```
pub fn disjoint(
    first: &Subpopulation,
    second: &Subpopulation,
    options: &CumulativeOptions,
) -> Result<CumulativeCurve> {
    options.validate()?;
    let merged = WeightedMerge::new(first, second)?;
    let runs = merged.runs();
    if runs.len() < 3 {
        return Err(Error::InsufficientData {
            what: "alternating runs of merged scores",
            needed: 3,
            got: runs.len(),
        });
    }

    let windows = runs.len() - 2;
    let mut diffs = Vec::with_capacity(windows);
    let mut weights = Vec::with_capacity(windows);
    let mut scores = Vec::with_capacity(windows);
    for w in runs.windows(3) {
        let (l, c, r) = (&w[0], &w[1], &w[2]);
        let a = ((c.response - l.response) + (c.response - r.response)) / 2.0;
        diffs.push(c.origin.sign() * a);
        weights.push((l.mean_weight + 2.0 * c.mean_weight + r.mean_weight) / 4.0);
        // Each window is labelled by the run that opens it.
        scores.push(l.score);
    }
    let inc = Increments {
        diffs,
        weights,
        scores,
    }
    .truncate(options.fraction, "windows of merged runs")?;

    let mut length_scale = if options.probs {
        inc.weights
            .iter()
            .zip(&inc.scores)
            .map(|(w, t)| w * w * t * (1.0 - t))
            .sum::<f64>()
            .sqrt()
    } else {
        // The division by 16 offsets the doubled window weights (squared)
        // and the two √2 factors applied below.
        (inc.second_difference_energy() / 16.0).sqrt()
    };
    // Dependence between neighbouring interpolated windows.
    length_scale *= std::f64::consts::SQRT_2;
    // Difference of two independent subpopulations.
    length_scale *= std::f64::consts::SQRT_2;

    debug!(
        runs = runs.len(),
        points = inc.diffs.len(),
        length_scale,
        "cumulative differences between disjoint subpopulations"
    );
    Ok(inc.into_curve(length_scale))
}

/// Which side of a subpopulation-versus-population comparison is the
/// minuend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Minuend {
    /// Subpopulation minus full population.
    #[default]
    Subpopulation,
    /// Full population minus subpopulation.
    Population,
}

impl Minuend {
    fn sign(self) -> f64 {
        match self {
            Minuend::Subpopulation => 1.0,
            Minuend::Population => -1.0,
        }
    }
}

/// Cumulative differences between a subpopulation and the full population.
///
/// `population` must be sorted by score (ties allowed); `indices` are the
/// strictly increasing positions of the subpopulation within it.
///
/// # Algorithm
/// The population is split into blocks of tied scores. For every block
/// containing subpopulation members, the difference between the
/// subpopulation's and the population's weighted average response is
/// weighted by the subpopulation's share of weight in that block.
///
/// The length scale is `sqrt(Σ (wᵢ/W)² sᵢ (1 − sᵢ))` over the retained
/// members when scores are probabilities, else
/// `sqrt(Σ Δa² (w_k + w_{k+1})² / 8)` over the blocks.
///
/// # Errors
/// - [`Error::EmptyInput`] if `indices` is empty.
/// - [`Error::NotSorted`] for decreasing scores or non-increasing indices.
/// - [`Error::IndexOutOfBounds`] for an index past the population.
/// - [`Error::InvalidFraction`] for a fraction outside `(0, 1]`.
pub fn versus_population(
    population: &Subpopulation,
    indices: &[usize],
    minuend: Minuend,
    options: &CumulativeOptions,
) -> Result<CumulativeCurve> {
    options.validate()?;
    validate_indices(indices, population.len())?;
    stats::check_non_decreasing(population.scores())?;

    let s = population.scores();
    let r = population.responses();
    let w = population.weights();
    let sign = minuend.sign();

    let mut diffs = Vec::new();
    let mut weights = Vec::new();
    let mut scores = Vec::new();
    // Members of each emitted block, as half-open ranges into `indices`.
    let mut members = Vec::new();

    let mut next = 0;
    let mut start = 0;
    while start < s.len() && next < indices.len() {
        let mut end = start;
        let mut full = WeightedMean::new();
        while end < s.len() && s[end] == s[start] {
            full.update(r[end], w[end]);
            end += 1;
        }
        let first_member = next;
        let mut sub = WeightedMean::new();
        while next < indices.len() && indices[next] < end {
            let i = indices[next];
            sub.update(r[i], w[i]);
            next += 1;
        }
        if let (Some(sub_mean), Some(full_mean)) = (sub.mean(), full.mean()) {
            diffs.push(sign * (sub_mean - full_mean));
            weights.push(sub.total_weight());
            scores.push(s[start]);
            members.push(first_member..next);
        }
        start = end;
    }

    let blocks = diffs.len();
    let inc = Increments {
        diffs,
        weights,
        scores,
    }
    .truncate(options.fraction, "subpopulation score blocks")?;

    let length_scale = if options.probs {
        let kept = &indices[..members[inc.diffs.len() - 1].end];
        let total: f64 = kept.iter().map(|&i| w[i]).sum();
        kept.iter()
            .map(|&i| {
                let wi = w[i] / total;
                wi * wi * s[i] * (1.0 - s[i])
            })
            .sum::<f64>()
            .sqrt()
    } else {
        (inc.second_difference_energy() / 8.0).sqrt()
    };

    debug!(
        population = population.len(),
        subpopulation = indices.len(),
        blocks,
        points = inc.diffs.len(),
        length_scale,
        "cumulative differences against the full population"
    );
    Ok(inc.into_curve(length_scale))
}

pub(crate) fn validate_indices(indices: &[usize], len: usize) -> Result<()> {
    if indices.is_empty() {
        return Err(Error::EmptyInput("subpopulation indices"));
    }
    if let Some(k) = indices.windows(2).position(|p| p[0] >= p[1]) {
        return Err(Error::NotSorted {
            index: k,
            required: "strictly increasing indices",
        });
    }
    match indices.last() {
        Some(&last) if last >= len => Err(Error::IndexOutOfBounds { index: last, len }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(responses: &[f64], scores: &[f64]) -> Subpopulation {
        Subpopulation::new(responses, scores, None).unwrap()
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} != {b}");
    }

    #[test]
    fn test_worked_example() {
        let a = sub(&[1.0, 0.0, 1.0], &[1.0, 3.0, 5.0]);
        let b = sub(&[0.0, 1.0, 0.0], &[2.0, 4.0, 6.0]);
        let curve = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
        let expected = [0.125, 0.0, -0.125, 0.0];
        assert_eq!(curve.len(), 4);
        for (c, e) in curve.ordinates.iter().zip(expected) {
            assert_close(*c, e, 1e-12);
        }
        for (x, e) in curve.abscissae.iter().zip([0.25, 0.5, 0.75, 1.0]) {
            assert_close(*x, e, 1e-12);
        }
        assert_eq!(curve.scores, vec![1.0, 2.0, 3.0, 4.0]);
        let st = curve.statistics;
        assert_close(st.kuiper, 0.25, 1e-12);
        assert_close(st.kolmogorov_smirnov, 0.125, 1e-12);
        assert_close(st.length_scale, std::f64::consts::SQRT_2 / 4.0, 1e-12);
        assert_eq!(st.sample_count, 4);
        assert_close(curve.terminal(), 0.0, 1e-12);
    }

    #[test]
    fn test_worked_example_probs() {
        let a = sub(&[1.0, 0.0, 1.0], &[0.1, 0.3, 0.5]);
        let b = sub(&[0.0, 1.0, 0.0], &[0.2, 0.4, 0.6]);
        let opts = CumulativeOptions::default().with_probs(true);
        let curve = disjoint(&a, &b, &opts).unwrap();
        // Windows weigh 1/4 each and are labelled by scores 0.1..0.4.
        let var: f64 = [0.1_f64, 0.2, 0.3, 0.4]
            .iter()
            .map(|t| 0.0625 * t * (1.0 - t))
            .sum();
        assert_close(curve.statistics.length_scale, 2.0 * var.sqrt(), 1e-12);
    }

    #[test]
    fn test_weighted_runs_match_reference() {
        // Values computed independently for these inputs.
        let a = Subpopulation::new(
            &[1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            &[0.05, 0.1, 0.35, 0.4, 0.45, 0.9],
            Some(&[1.0, 2.0, 1.5, 0.5, 1.0, 3.0]),
        )
        .unwrap();
        let b = Subpopulation::new(
            &[0.0, 1.0, 0.0, 0.0, 1.0],
            &[0.2, 0.25, 0.5, 0.7, 0.8],
            Some(&[2.0, 1.0, 1.0, 2.5, 0.5]),
        )
        .unwrap();
        let curve = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
        assert_eq!(curve.statistics.sample_count, 3);
        let expected = REFERENCE_ORDINATES;
        for (c, e) in curve.ordinates.iter().zip(expected) {
            assert_close(*c, e, 1e-9);
        }
        assert_close(curve.statistics.length_scale, REFERENCE_LENGTH_SCALE, 1e-9);
        assert_close(curve.statistics.kuiper, REFERENCE_ORDINATES[2], 1e-9);
        assert_close(curve.statistics.kolmogorov_smirnov, REFERENCE_ORDINATES[2], 1e-9);

        let opts = CumulativeOptions::default().with_probs(true);
        let curve = disjoint(&a, &b, &opts).unwrap();
        assert_close(curve.statistics.length_scale, REFERENCE_PROBS_LENGTH_SCALE, 1e-9);
    }

    const REFERENCE_ORDINATES: [f64; 3] =
        [0.05392156862745098, 0.17830882352941177, 0.4560866013071895];
    const REFERENCE_LENGTH_SCALE: f64 = 0.1231536774922088;
    const REFERENCE_PROBS_LENGTH_SCALE: f64 = 0.48314382440430687;

    #[test]
    fn test_swapping_negates_curve() {
        let a = Subpopulation::new(
            &[0.3, 0.9, 0.1, 0.5],
            &[0.1, 0.25, 0.6, 0.8],
            Some(&[1.0, 2.0, 0.5, 1.5]),
        )
        .unwrap();
        let b = Subpopulation::new(&[0.7, 0.2, 0.4], &[0.2, 0.5, 0.9], Some(&[0.2, 1.0, 3.0]))
            .unwrap();
        let opts = CumulativeOptions::default();
        let ab = disjoint(&a, &b, &opts).unwrap();
        let ba = disjoint(&b, &a, &opts).unwrap();
        assert_eq!(ab.len(), ba.len());
        for (x, y) in ab.ordinates.iter().zip(&ba.ordinates) {
            assert_eq!(*x, -*y);
        }
        assert_eq!(ab.abscissae, ba.abscissae);
        assert_eq!(ab.statistics, ba.statistics);
    }

    #[test]
    fn test_disjoint_rejects_shared_scores() {
        let a = sub(&[1.0, 0.0], &[1.0, 2.0]);
        let b = sub(&[0.0, 1.0], &[2.0, 3.0]);
        assert!(matches!(
            disjoint(&a, &b, &CumulativeOptions::default()),
            Err(Error::NotDisjoint { .. })
        ));
    }

    #[test]
    fn test_disjoint_needs_three_runs() {
        let a = sub(&[1.0, 0.0], &[1.0, 2.0]);
        let b = sub(&[0.0, 1.0], &[3.0, 4.0]);
        assert!(matches!(
            disjoint(&a, &b, &CumulativeOptions::default()),
            Err(Error::InsufficientData { needed: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_fraction_truncates_and_renormalizes() {
        let a = sub(&[1.0, 0.0, 1.0, 0.0], &[1.0, 3.0, 5.0, 7.0]);
        let b = sub(&[0.0, 1.0, 0.0, 1.0], &[2.0, 4.0, 6.0, 8.0]);
        let full = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
        assert_eq!(full.len(), 6);
        let half = disjoint(&a, &b, &CumulativeOptions::default().with_fraction(0.5)).unwrap();
        assert_eq!(half.len(), 3);
        assert_close(*half.abscissae.last().unwrap(), 1.0, 1e-12);
        assert!(matches!(
            disjoint(&a, &b, &CumulativeOptions::default().with_fraction(0.0)),
            Err(Error::InvalidFraction(_))
        ));
        assert!(disjoint(&a, &b, &CumulativeOptions::default().with_fraction(1.5)).is_err());
    }

    #[test]
    fn test_versus_population_hand_computed() {
        // Population with a tie at 0.5; subpopulation = positions 1 and 2.
        let pop = Subpopulation::new(
            &[1.0, 0.0, 1.0, 1.0],
            &[0.2, 0.5, 0.5, 0.8],
            Some(&[1.0, 1.0, 3.0, 1.0]),
        )
        .unwrap();
        let curve = versus_population(&pop, &[1, 2], Minuend::Subpopulation, &Default::default())
            .unwrap();
        // One block (score 0.5): subpop mean 0.75, population mean 0.75.
        assert_eq!(curve.len(), 1);
        assert_close(curve.terminal(), 0.0, 1e-15);

        let curve = versus_population(&pop, &[0, 1], Minuend::Subpopulation, &Default::default())
            .unwrap();
        // Block 0.2: 1 - 1 = 0, weight 1/2; block 0.5: 0 - 0.75, weight 1/2.
        assert_eq!(curve.len(), 2);
        assert_close(curve.ordinates[0], 0.0, 1e-15);
        assert_close(curve.ordinates[1], -0.375, 1e-15);
        assert_eq!(curve.scores, vec![0.2, 0.5]);
        // Δa = -0.75, (w0 + w1)² = 1  →  sqrt(0.5625 / 8)
        assert_close(curve.statistics.length_scale, (0.5625_f64 / 8.0).sqrt(), 1e-15);
        assert_close(curve.statistics.kuiper, 0.375, 1e-15);
    }

    #[test]
    fn test_versus_population_probs_length_scale() {
        let pop = sub(&[1.0, 0.0, 1.0, 0.0], &[0.2, 0.4, 0.6, 0.8]);
        let opts = CumulativeOptions::default().with_probs(true);
        let curve = versus_population(&pop, &[0, 3], Minuend::Subpopulation, &opts).unwrap();
        let expected = (0.25 * 0.2 * 0.8 + 0.25 * 0.8 * 0.2_f64).sqrt();
        assert_close(curve.statistics.length_scale, expected, 1e-15);
    }

    #[test]
    fn test_versus_population_probs_length_scale_truncated() {
        // Member blocks 0.2 {0, 1}, 0.4 {2, 3}, 0.8 {5}; 3 · 0.7 keeps two.
        let pop = Subpopulation::new(
            &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            &[0.2, 0.2, 0.4, 0.4, 0.6, 0.8],
            Some(&[1.0, 3.0, 2.0, 2.0, 1.0, 1.0]),
        )
        .unwrap();
        let idx = [0, 1, 2, 3, 5];
        let opts = CumulativeOptions::default().with_probs(true);

        let full = versus_population(&pop, &idx, Minuend::Subpopulation, &opts).unwrap();
        assert_eq!(full.len(), 3);
        // Weights 1, 3, 2, 2, 1 over a total of 9.
        let expected = ((0.16 + 9.0 * 0.16 + 8.0 * 0.24 + 0.16) / 81.0_f64).sqrt();
        assert_close(full.statistics.length_scale, expected, 1e-14);

        let cut = versus_population(&pop, &idx, Minuend::Subpopulation, &opts.with_fraction(0.7))
            .unwrap();
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.scores, vec![0.2, 0.4]);
        // Only positions 0..=3 remain, renormalized over a total of 8.
        let expected = ((0.16 + 9.0 * 0.16 + 8.0 * 0.24) / 64.0_f64).sqrt();
        assert_close(cut.statistics.length_scale, expected, 1e-14);
    }

    #[test]
    fn test_versus_population_antisymmetric() {
        let pop = Subpopulation::new(
            &[0.1, 0.8, 0.4, 0.9, 0.3, 0.6],
            &[0.1, 0.2, 0.2, 0.4, 0.7, 0.9],
            Some(&[1.0, 0.5, 2.0, 1.0, 1.5, 0.7]),
        )
        .unwrap();
        let idx = [1, 3, 5];
        let opts = CumulativeOptions::default();
        let sp = versus_population(&pop, &idx, Minuend::Subpopulation, &opts).unwrap();
        let ps = versus_population(&pop, &idx, Minuend::Population, &opts).unwrap();
        for (x, y) in sp.ordinates.iter().zip(&ps.ordinates) {
            assert_eq!(*x, -*y);
        }
        assert_eq!(sp.statistics, ps.statistics);
    }

    #[test]
    fn test_versus_population_index_validation() {
        let pop = sub(&[1.0, 0.0], &[0.2, 0.4]);
        let opts = CumulativeOptions::default();
        assert!(matches!(
            versus_population(&pop, &[], Minuend::Subpopulation, &opts),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            versus_population(&pop, &[1, 0], Minuend::Subpopulation, &opts),
            Err(Error::NotSorted { .. })
        ));
        assert!(matches!(
            versus_population(&pop, &[0, 2], Minuend::Subpopulation, &opts),
            Err(Error::IndexOutOfBounds { index: 2, len: 2 })
        ));
        let unsorted = sub(&[1.0, 0.0], &[0.4, 0.2]);
        assert!(matches!(
            versus_population(&unsorted, &[0], Minuend::Subpopulation, &opts),
            Err(Error::NotSorted { .. })
        ));
    }

    #[test]
    fn test_constant_deviation_has_zero_empirical_scale() {
        let a = sub(&[1.0, 1.0, 1.0, 1.0], &[1.0, 3.0, 5.0, 7.0]);
        let b = sub(&[0.0, 0.0, 0.0, 0.0], &[2.0, 4.0, 6.0, 8.0]);
        let curve = disjoint(&a, &b, &CumulativeOptions::default()).unwrap();
        assert_eq!(curve.statistics.length_scale, 0.0);
        assert_close(curve.terminal(), 1.0, 1e-12);
        assert_eq!(curve.statistics.kuiper_p_value(), 0.0);
        assert_eq!(curve.statistics.kolmogorov_smirnov_p_value(), 0.0);
    }

    #[test]
    fn test_p_values_in_unit_interval() {
        let a = sub(&[1.0, 0.0, 1.0, 0.0, 1.0], &[1.0, 3.0, 5.0, 7.0, 9.0]);
        let b = sub(&[0.0, 0.0, 1.0, 1.0, 0.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        let st = disjoint(&a, &b, &CumulativeOptions::default())
            .unwrap()
            .statistics;
        for p in [st.kuiper_p_value(), st.kolmogorov_smirnov_p_value()] {
            assert!((0.0..=1.0).contains(&p), "p = {p}");
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Two interleavable subpopulations on distinct integer scores.
    fn disjoint_pair() -> impl Strategy<Value = (Subpopulation, Subpopulation)> {
        proptest::collection::vec((0.0_f64..1.0, 0.1_f64..5.0, any::<bool>()), 6..80).prop_map(
            |rows| {
                let mut cols = [(vec![], vec![], vec![]), (vec![], vec![], vec![])];
                for (k, (r, w, side)) in rows.into_iter().enumerate() {
                    let c = &mut cols[side as usize];
                    c.0.push(r);
                    c.1.push(k as f64);
                    c.2.push(w);
                }
                let [a, b] = cols;
                (
                    Subpopulation::new(&a.0, &a.1, Some(&a.2)).unwrap(),
                    Subpopulation::new(&b.0, &b.1, Some(&b.2)).unwrap(),
                )
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn statistics_are_ordered((a, b) in disjoint_pair()) {
            let Ok(curve) = disjoint(&a, &b, &CumulativeOptions::default()) else {
                return Ok(());
            };
            let st = curve.statistics;
            prop_assert!(st.kolmogorov_smirnov >= 0.0);
            prop_assert!(st.kuiper >= st.kolmogorov_smirnov);
            prop_assert!(st.kuiper <= 2.0 * st.kolmogorov_smirnov + 1e-15);
            prop_assert!(st.length_scale >= 0.0);
            prop_assert!((curve.abscissae.last().unwrap() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn swap_negates((a, b) in disjoint_pair()) {
            let opts = CumulativeOptions::default();
            if let (Ok(ab), Ok(ba)) = (disjoint(&a, &b, &opts), disjoint(&b, &a, &opts)) {
                for (x, y) in ab.ordinates.iter().zip(&ba.ordinates) {
                    prop_assert_eq!(*x, -*y);
                }
            }
        }
    }
}
