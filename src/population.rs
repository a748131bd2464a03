//! Full populations, score sorting, and dithering.
//!
//! A [`Population`] keeps observations in their original order; the
//! position of an observation there is its *id*. Sorting produces a
//! [`SortedPopulation`] that remembers the id at every sorted position, so
//! a subpopulation defined on ids (say, by a demographic column the caller
//! holds) maps straight to sorted positions.
//!
//! Comparing two subpopulations in disjoint mode needs distinct scores.
//! [`dither`] perturbs every score by a distinct multiple of a tiny scale,
//! and [`Population::sorted_dithered`] sorts on the perturbed scores while
//! keeping the original ones alongside for estimators that should see them.

use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::observation::Subpopulation;
use crate::random;

/// Observations in their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    data: Subpopulation,
}

impl Population {
    /// Builds a population from parallel columns; scores need not be sorted.
    ///
    /// # Errors
    /// As [`Subpopulation::new`].
    pub fn new(responses: &[f64], scores: &[f64], weights: Option<&[f64]>) -> Result<Self> {
        Ok(Self {
            data: Subpopulation::new(responses, scores, weights)?,
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the population is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The observations, indexed by id.
    pub fn observations(&self) -> &Subpopulation {
        &self.data
    }

    /// Stable sort by score.
    ///
    /// # Examples
    /// ```
    /// use u_subpop::population::Population;
    /// let pop = Population::new(&[1.0, 0.0, 1.0], &[0.7, 0.2, 0.2], None).unwrap();
    /// let sorted = pop.sorted();
    /// assert_eq!(sorted.ids(), &[1, 2, 0]);
    /// assert_eq!(sorted.observations().scores(), &[0.2, 0.2, 0.7]);
    /// ```
    pub fn sorted(&self) -> SortedPopulation {
        let scores = self.data.scores().to_vec();
        self.sorted_by_key(&scores)
    }

    /// Dithers the scores with [`dither`], then sorts on the dithered
    /// scores. The original scores travel along as
    /// [`SortedPopulation::raw_scores`].
    ///
    /// # Errors
    /// As [`dither`].
    pub fn sorted_dithered<R: Rng>(&self, scale: f64, rng: &mut R) -> Result<SortedPopulation> {
        let dithered = dither(self.data.scores(), scale, rng)?;
        Ok(self.sorted_by_key(&dithered))
    }

    fn sorted_by_key(&self, key: &[f64]) -> SortedPopulation {
        let mut ids: Vec<usize> = (0..self.len()).collect();
        ids.sort_by(|&a, &b| key[a].total_cmp(&key[b]));
        let r = self.data.responses();
        let s = self.data.scores();
        let w = self.data.weights();
        let data = Subpopulation::from_columns_unchecked(
            ids.iter().map(|&i| r[i]).collect(),
            ids.iter().map(|&i| key[i]).collect(),
            ids.iter().map(|&i| w[i]).collect(),
        );
        let raw_scores = ids.iter().map(|&i| s[i]).collect();
        SortedPopulation {
            data,
            raw_scores,
            ids,
        }
    }
}

/// A population sorted by score, remembering each position's original id.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedPopulation {
    data: Subpopulation,
    raw_scores: Vec<f64>,
    ids: Vec<usize>,
}

impl SortedPopulation {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the population is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Observations in sorted order, carrying the scores sorted on.
    pub fn observations(&self) -> &Subpopulation {
        &self.data
    }

    /// Original id at every sorted position.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Scores before dithering, in sorted order. Equal to the sorted scores
    /// when no dithering took place.
    pub fn raw_scores(&self) -> &[f64] {
        &self.raw_scores
    }

    /// Sorted positions whose original id satisfies `member`, ascending.
    pub fn positions_where(&self, mut member: impl FnMut(usize) -> bool) -> Vec<usize> {
        self.ids
            .iter()
            .enumerate()
            .filter_map(|(pos, &id)| member(id).then_some(pos))
            .collect()
    }

    /// Sorted positions of the given original ids, ascending.
    ///
    /// # Errors
    /// [`Error::IndexOutOfBounds`] for an id past the population.
    pub fn positions_of(&self, ids: &[usize]) -> Result<Vec<usize>> {
        let mut mask = vec![false; self.len()];
        for &id in ids {
            if id >= self.len() {
                return Err(Error::IndexOutOfBounds {
                    index: id,
                    len: self.len(),
                });
            }
            mask[id] = true;
        }
        Ok(self.positions_where(|id| mask[id]))
    }

    /// The subpopulation at `positions`, with the sorted-on scores.
    ///
    /// # Errors
    /// [`Error::IndexOutOfBounds`] for a position past the end.
    pub fn subpopulation(&self, positions: &[usize]) -> Result<Subpopulation> {
        self.data.select(positions)
    }

    /// The subpopulation at `positions`, with the scores before dithering.
    ///
    /// # Errors
    /// [`Error::IndexOutOfBounds`] for a position past the end.
    pub fn raw_subpopulation(&self, positions: &[usize]) -> Result<Subpopulation> {
        self.data.with_scores(&self.raw_scores)?.select(positions)
    }
}

/// Perturbs scores to make them distinct.
///
/// Score `i` moves by `(2·π(i)/n − 1)·scale` for a uniform random
/// permutation `π` of `0..n`, so every perturbation lies in
/// `[−scale, scale)` up to rounding and no two are equal.
///
/// # Errors
/// - [`Error::InvalidParameter`] if `scale` is negative or not finite.
/// - [`Error::DitherCollision`] if the perturbed scores are still not all
///   distinct (the scale is too small for the magnitude of the scores).
///
/// # Examples
/// ```
/// use u_subpop::population::dither;
/// use u_subpop::random::create_rng;
/// let d = dither(&[0.5, 0.5, 0.5], 1e-8, &mut create_rng(543216789)).unwrap();
/// assert!(d.iter().all(|x| (x - 0.5).abs() <= 1e-8 + 1e-15));
/// assert!(d[0] != d[1] && d[1] != d[2] && d[0] != d[2]);
/// ```
pub fn dither<R: Rng>(scores: &[f64], scale: f64, rng: &mut R) -> Result<Vec<f64>> {
    if !(scale.is_finite() && scale >= 0.0) {
        return Err(Error::invalid_parameter(format!(
            "dither scale must be finite and non-negative, got {scale}"
        )));
    }
    let n = scores.len();
    let perm = random::shuffled_indices(n, rng);
    let dithered: Vec<f64> = scores
        .iter()
        .zip(&perm)
        .map(|(&s, &p)| s + (2.0 * p as f64 / n as f64 - 1.0) * scale)
        .collect();

    let mut check = dithered.clone();
    check.sort_by(f64::total_cmp);
    if let Some(pair) = check.windows(2).find(|p| p[0] == p[1]) {
        return Err(Error::DitherCollision { score: pair[0] });
    }
    debug!(n, scale, "dithered scores");
    Ok(dithered)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn sorted_ids_are_a_permutation(
            scores in proptest::collection::vec(0_u8..10, 0..80),
        ) {
            let s: Vec<f64> = scores.iter().map(|&x| x as f64 / 10.0).collect();
            let pop = Population::new(&vec![0.0; s.len()], &s, None).unwrap();
            let sorted = pop.sorted();
            let mut ids = sorted.ids().to_vec();
            ids.sort_unstable();
            prop_assert_eq!(ids, (0..s.len()).collect::<Vec<_>>());
            let sorted_scores = sorted.observations().scores();
            prop_assert!(sorted_scores.windows(2).all(|p| p[0] <= p[1]));
        }

        #[test]
        fn dither_separates_ties(
            scores in proptest::collection::vec(0_u8..5, 1..80),
            seed in 0_u64..1000,
        ) {
            let s: Vec<f64> = scores.iter().map(|&x| x as f64 / 4.0).collect();
            let d = dither(&s, 1e-8, &mut create_rng(seed)).unwrap();
            // The offset is added in floating point, so allow a few ulps.
            for (a, b) in s.iter().zip(&d) {
                prop_assert!((a - b).abs() <= 1e-8 + 4.0 * f64::EPSILON * a.abs().max(1.0));
            }
        }
    }
}
