//! Settings for a full comparison run.
//!
//! Every field has a serde default, so a partial JSON/TOML document (or an
//! empty one) deserializes into a usable configuration.

use serde::{Deserialize, Serialize};

use crate::cumulative::{CumulativeOptions, Minuend};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Scores are probabilities for Bernoulli responses.
    #[serde(default)]
    pub probs: bool,
    /// Leading share of each cumulative curve to keep.
    #[serde(default = "ComparisonConfig::default_fraction")]
    pub fraction: f64,
    /// Bin counts for the reliability diagrams.
    #[serde(default = "ComparisonConfig::default_bin_counts")]
    pub bin_counts: Vec<usize>,
    /// Tie-breakings for the matched ATE on dithered (distinct) scores.
    #[serde(default = "ComparisonConfig::default_num_rand")]
    pub num_rand: usize,
    /// Tie-breakings for the matched ATE on the original scores.
    #[serde(default = "ComparisonConfig::default_num_rand_undithered")]
    pub num_rand_undithered: usize,
    /// Seed for equal-error binning; reseeded for every bin count.
    #[serde(default = "ComparisonConfig::default_binning_seed")]
    pub binning_seed: u64,
    /// Seed for dithering, continued by the matched ATE.
    #[serde(default = "ComparisonConfig::default_dither_seed")]
    pub dither_seed: u64,
    /// Half-width of the dithering perturbation.
    #[serde(default = "ComparisonConfig::default_dither_scale")]
    pub dither_scale: f64,
    /// Orientation of subpopulation-versus-population differences.
    #[serde(default)]
    pub minuend: Minuend,
}

impl ComparisonConfig {
    fn default_fraction() -> f64 {
        1.0
    }
    fn default_bin_counts() -> Vec<usize> {
        vec![2, 5, 10, 20, 40]
    }
    fn default_num_rand() -> usize {
        1
    }
    fn default_num_rand_undithered() -> usize {
        25
    }
    fn default_binning_seed() -> u64 {
        987_654_321
    }
    fn default_dither_seed() -> u64 {
        543_216_789
    }
    fn default_dither_scale() -> f64 {
        1e-8
    }

    /// Options for the cumulative statistic.
    pub fn cumulative_options(&self) -> CumulativeOptions {
        CumulativeOptions::default()
            .with_probs(self.probs)
            .with_fraction(self.fraction)
    }

    /// Rejects settings no comparison can run with.
    ///
    /// # Errors
    /// - [`Error::InvalidFraction`] for a fraction outside `(0, 1]`.
    /// - [`Error::InvalidBinCount`] for a zero bin count.
    /// - [`Error::InvalidParameter`] for zero tie-breakings or a dither
    ///   scale that is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        self.cumulative_options().validate()?;
        if self.bin_counts.contains(&0) {
            return Err(Error::InvalidBinCount);
        }
        if self.num_rand == 0 || self.num_rand_undithered == 0 {
            return Err(Error::invalid_parameter(
                "numbers of tie-breakings must be positive",
            ));
        }
        if !(self.dither_scale.is_finite() && self.dither_scale >= 0.0) {
            return Err(Error::invalid_parameter(format!(
                "dither scale must be finite and non-negative, got {}",
                self.dither_scale
            )));
        }
        Ok(())
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            probs: false,
            fraction: Self::default_fraction(),
            bin_counts: Self::default_bin_counts(),
            num_rand: Self::default_num_rand(),
            num_rand_undithered: Self::default_num_rand_undithered(),
            binning_seed: Self::default_binning_seed(),
            dither_seed: Self::default_dither_seed(),
            dither_scale: Self::default_dither_scale(),
            minuend: Minuend::default(),
        }
    }
}
