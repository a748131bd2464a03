//! End-to-end comparisons producing a serializable report.
//!
//! These functions chain the pieces of the crate the way an analysis of a
//! survey usually does: sort (and, for disjoint comparisons, dither) the
//! population, carve out the subpopulations by id, compute the cumulative
//! statistic with its p-values, bin for reliability diagrams at every
//! configured bin count, and estimate the average effect. Rendering and
//! persistence are left to the caller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ate;
use crate::binning::{self, BinSummary, EquierrBins};
use crate::config::ComparisonConfig;
use crate::cumulative::{self, CumulativeCurve};
use crate::error::{Error, Result};
use crate::population::Population;
use crate::random::create_rng;

/// Which comparison produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonKind {
    /// Two subpopulations with dithered, distinct scores.
    Disjoint,
    /// One subpopulation against the full population.
    VersusPopulation,
}

/// Reliability-diagram bins at one bin count.
///
/// Index 0 is the first subpopulation. Index 1 is the second subpopulation,
/// or the full population in a [`ComparisonKind::VersusPopulation`] report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedDiagram {
    pub nbins: usize,
    pub equiscore: [Vec<BinSummary>; 2],
    pub equierr: [EquierrBins; 2],
}

/// Everything a comparison computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub kind: ComparisonKind,
    /// Sizes of the two sides compared.
    pub sizes: [usize; 2],
    /// Distinct original scores in the population.
    pub distinct_scores: usize,
    pub curve: CumulativeCurve,
    pub standardized_kuiper: f64,
    pub standardized_kolmogorov_smirnov: f64,
    pub kuiper_p_value: f64,
    pub kolmogorov_smirnov_p_value: f64,
    /// Matched ATE on the dithered scores (disjoint), or the weighted
    /// average deviation from the population (the curve's final value).
    pub effect: f64,
    /// Matched ATE on the original scores, with random tie-breaking.
    pub effect_undithered: Option<f64>,
    pub bins: Vec<BinnedDiagram>,
}

impl ComparisonReport {
    fn new(
        kind: ComparisonKind,
        sizes: [usize; 2],
        distinct_scores: usize,
        curve: CumulativeCurve,
        effect: f64,
        effect_undithered: Option<f64>,
        bins: Vec<BinnedDiagram>,
    ) -> Self {
        let st = curve.statistics;
        Self {
            kind,
            sizes,
            distinct_scores,
            standardized_kuiper: st.standardized_kuiper(),
            standardized_kolmogorov_smirnov: st.standardized_kolmogorov_smirnov(),
            kuiper_p_value: st.kuiper_p_value(),
            kolmogorov_smirnov_p_value: st.kolmogorov_smirnov_p_value(),
            curve,
            effect,
            effect_undithered,
            bins,
        }
    }
}

/// Compares two subpopulations of `population`, given by original ids.
///
/// # Pipeline
/// 1. Dither all scores with a generator seeded by `dither_seed` and sort
///    on the dithered scores.
/// 2. Cumulative differences in disjoint mode, with p-values.
/// 3. For each bin count: [`binning::equiscore_pair`], and
///    [`binning::equierr_pair`] with a generator freshly seeded by
///    `binning_seed`.
/// 4. [`ate::matched_ate`] on the dithered scores (`num_rand` times), then
///    on the original scores (`num_rand_undithered` times), both continuing
///    the dithering generator.
///
/// # Errors
/// - Anything [`ComparisonConfig::validate`] rejects.
/// - [`Error::EmptyInput`] if either id list is empty.
/// - [`Error::IndexOutOfBounds`] for an id past the population.
/// - Errors of the individual steps, e.g. [`Error::NotDisjoint`] when the
///   two id lists overlap.
pub fn compare_disjoint(
    population: &Population,
    members: [&[usize]; 2],
    config: &ComparisonConfig,
) -> Result<ComparisonReport> {
    config.validate()?;
    if members[0].is_empty() || members[1].is_empty() {
        return Err(Error::EmptyInput("subpopulation ids"));
    }
    let mut rng = create_rng(config.dither_seed);
    let sorted = population.sorted_dithered(config.dither_scale, &mut rng)?;
    let positions = [
        sorted.positions_of(members[0])?,
        sorted.positions_of(members[1])?,
    ];
    let first = sorted.subpopulation(&positions[0])?;
    let second = sorted.subpopulation(&positions[1])?;

    let curve = cumulative::disjoint(&first, &second, &config.cumulative_options())?;

    let mut bins = Vec::with_capacity(config.bin_counts.len());
    for &nbins in &config.bin_counts {
        let equiscore = binning::equiscore_pair(&first, &second, nbins)?;
        let mut binning_rng = create_rng(config.binning_seed);
        let equierr = binning::equierr_pair(&first, &second, nbins, &mut binning_rng)?;
        bins.push(BinnedDiagram {
            nbins,
            equiscore,
            equierr,
        });
    }

    let effect = ate::matched_ate(&first, &second, config.num_rand, &mut rng)?;
    let raw_first = sorted.raw_subpopulation(&positions[0])?;
    let raw_second = sorted.raw_subpopulation(&positions[1])?;
    let effect_undithered =
        ate::matched_ate(&raw_first, &raw_second, config.num_rand_undithered, &mut rng)?;

    let report = ComparisonReport::new(
        ComparisonKind::Disjoint,
        [first.len(), second.len()],
        distinct(population.observations().scores()),
        curve,
        effect,
        Some(effect_undithered),
        bins,
    );
    info!(
        first = first.len(),
        second = second.len(),
        kuiper_p = report.kuiper_p_value,
        ks_p = report.kolmogorov_smirnov_p_value,
        effect,
        effect_undithered,
        "compared disjoint subpopulations"
    );
    Ok(report)
}

/// Compares a subpopulation of `population`, given by original ids, with
/// the whole population.
///
/// Scores are sorted as given (ties allowed, no dithering). Bins are
/// computed for the subpopulation and for the full population on their own
/// weights; for equal-error bins one generator, freshly seeded by
/// `binning_seed` for every bin count, serves the subpopulation first.
///
/// # Errors
/// - Anything [`ComparisonConfig::validate`] rejects.
/// - [`Error::EmptyInput`] if `members` is empty.
/// - [`Error::IndexOutOfBounds`] for an id past the population.
pub fn compare_to_population(
    population: &Population,
    members: &[usize],
    config: &ComparisonConfig,
) -> Result<ComparisonReport> {
    config.validate()?;
    let sorted = population.sorted();
    let positions = sorted.positions_of(members)?;
    let curve = cumulative::versus_population(
        sorted.observations(),
        &positions,
        config.minuend,
        &config.cumulative_options(),
    )?;
    let sub = sorted.subpopulation(&positions)?;
    let full = sorted.observations();

    let mut bins = Vec::with_capacity(config.bin_counts.len());
    for &nbins in &config.bin_counts {
        let equiscore = [binning::equiscore(&sub, nbins)?, binning::equiscore(full, nbins)?];
        let mut binning_rng = create_rng(config.binning_seed);
        let equierr = [
            binning::equierr(&sub, nbins, &mut binning_rng)?,
            binning::equierr(full, nbins, &mut binning_rng)?,
        ];
        bins.push(BinnedDiagram {
            nbins,
            equiscore,
            equierr,
        });
    }

    let effect = curve.terminal();
    let report = ComparisonReport::new(
        ComparisonKind::VersusPopulation,
        [sub.len(), full.len()],
        distinct(full.scores()),
        curve,
        effect,
        None,
        bins,
    );
    info!(
        subpopulation = sub.len(),
        population = full.len(),
        kuiper_p = report.kuiper_p_value,
        ks_p = report.kolmogorov_smirnov_p_value,
        effect,
        "compared subpopulation with full population"
    );
    Ok(report)
}

fn distinct(scores: &[f64]) -> usize {
    let mut s = scores.to_vec();
    s.sort_by(f64::total_cmp);
    s.dedup();
    s.len()
}
