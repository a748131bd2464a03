//! Weighted merge of two disjoint sorted subpopulations.
//!
//! The merge keeps provenance explicitly: every entry carries the
//! subpopulation it came from and its index there, so later stages read
//! responses and weights through that handle instead of reconstructing
//! inverse permutations.
//!
//! # Algorithm
//!
//! Stable two-pointer merge, O(n₀ + n₁). Weights are normalized jointly so
//! that both subpopulations together carry total weight 1.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::observation::Subpopulation;
use crate::stats::{self, WeightedMean};

/// Which of the two compared subpopulations an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Subpopulation 0.
    First,
    /// Subpopulation 1.
    Second,
}

impl Origin {
    /// 0 for [`Origin::First`], 1 for [`Origin::Second`].
    pub fn index(self) -> usize {
        match self {
            Origin::First => 0,
            Origin::Second => 1,
        }
    }

    /// The opposite subpopulation.
    pub fn other(self) -> Origin {
        match self {
            Origin::First => Origin::Second,
            Origin::Second => Origin::First,
        }
    }

    /// `+1` for subpopulation 0, `−1` for subpopulation 1.
    ///
    /// Multiplying a difference by this sign orients it as
    /// "subpopulation 0 minus subpopulation 1".
    pub fn sign(self) -> f64 {
        match self {
            Origin::First => 1.0,
            Origin::Second => -1.0,
        }
    }
}

/// One entry of a merged sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedEntry {
    pub origin: Origin,
    /// Position within the originating subpopulation.
    pub index: usize,
    pub score: f64,
    /// Weight after joint normalization.
    pub weight: f64,
}

/// A maximal block of consecutive merged entries sharing an origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    pub origin: Origin,
    /// Half-open range of merged positions.
    pub start: usize,
    pub end: usize,
    /// Weighted average response.
    pub response: f64,
    /// Weighted average score.
    pub score: f64,
    /// Total normalized weight.
    pub weight: f64,
    /// Arithmetic mean of the normalized weights of the entries.
    pub mean_weight: f64,
}

impl Run {
    /// Number of merged entries in the run.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the run holds no entries.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Two subpopulations merged into one ascending sequence.
///
/// # Examples
/// ```
/// use u_subpop::merge::{Origin, WeightedMerge};
/// use u_subpop::observation::Subpopulation;
///
/// let a = Subpopulation::new(&[1.0, 0.0], &[1.0, 3.0], None).unwrap();
/// let b = Subpopulation::new(&[0.0, 1.0], &[2.0, 4.0], None).unwrap();
/// let merged = WeightedMerge::new(&a, &b).unwrap();
/// let origins: Vec<Origin> = merged.entries().iter().map(|e| e.origin).collect();
/// assert_eq!(origins, [Origin::First, Origin::Second, Origin::First, Origin::Second]);
/// assert_eq!(merged.runs().len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct WeightedMerge<'a> {
    sources: [&'a Subpopulation; 2],
    weights: [Vec<f64>; 2],
    entries: Vec<MergedEntry>,
}

impl<'a> WeightedMerge<'a> {
    /// Merges `first` and `second`.
    ///
    /// # Errors
    /// - [`Error::NotSorted`] if either score sequence is not strictly increasing.
    /// - [`Error::NotDisjoint`] if the two share a score.
    pub fn new(first: &'a Subpopulation, second: &'a Subpopulation) -> Result<Self> {
        stats::check_strictly_increasing(first.scores())?;
        stats::check_strictly_increasing(second.scores())?;
        let (w0, w1) = stats::normalize_jointly(first.weights(), second.weights());

        let s0 = first.scores();
        let s1 = second.scores();
        let mut entries = Vec::with_capacity(s0.len() + s1.len());
        let (mut i0, mut i1) = (0, 0);
        while i0 < s0.len() || i1 < s1.len() {
            let take_first = if i0 == s0.len() {
                false
            } else if i1 == s1.len() {
                true
            } else if s0[i0] == s1[i1] {
                return Err(Error::NotDisjoint { score: s0[i0] });
            } else {
                s0[i0] < s1[i1]
            };
            if take_first {
                entries.push(MergedEntry {
                    origin: Origin::First,
                    index: i0,
                    score: s0[i0],
                    weight: w0[i0],
                });
                i0 += 1;
            } else {
                entries.push(MergedEntry {
                    origin: Origin::Second,
                    index: i1,
                    score: s1[i1],
                    weight: w1[i1],
                });
                i1 += 1;
            }
        }
        debug!(
            first = s0.len(),
            second = s1.len(),
            "merged disjoint subpopulations"
        );
        Ok(Self {
            sources: [first, second],
            weights: [w0, w1],
            entries,
        })
    }

    /// Merged entries in score order.
    pub fn entries(&self) -> &[MergedEntry] {
        &self.entries
    }

    /// Number of merged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the merge is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Origin of the lowest score, if any.
    pub fn leading_origin(&self) -> Option<Origin> {
        self.entries.first().map(|e| e.origin)
    }

    /// Jointly normalized weights of one subpopulation, in its own order.
    pub fn normalized_weights(&self, origin: Origin) -> &[f64] {
        &self.weights[origin.index()]
    }

    /// Response of a merged entry, read through its handle.
    pub fn response(&self, entry: &MergedEntry) -> f64 {
        self.sources[entry.origin.index()].responses()[entry.index]
    }

    /// Groups consecutive same-origin entries.
    ///
    /// Runs alternate in origin, starting with [`leading_origin`](Self::leading_origin).
    pub fn runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut start = 0;
        while start < self.entries.len() {
            let origin = self.entries[start].origin;
            let mut end = start;
            let mut response = WeightedMean::new();
            let mut score = WeightedMean::new();
            while end < self.entries.len() && self.entries[end].origin == origin {
                let e = &self.entries[end];
                response.update(self.response(e), e.weight);
                score.update(e.score, e.weight);
                end += 1;
            }
            runs.push(Run {
                origin,
                start,
                end,
                response: response.mean_or_nan(),
                score: score.mean_or_nan(),
                weight: response.total_weight(),
                mean_weight: response.total_weight() / (end - start) as f64,
            });
            start = end;
        }
        runs
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn merge_is_sorted_and_complete(
            a in proptest::collection::btree_set(0_u32..10_000, 1..60),
            b in proptest::collection::btree_set(0_u32..10_000, 1..60),
        ) {
            let b: Vec<u32> = b.difference(&a).copied().collect();
            prop_assume!(!b.is_empty());
            let sa: Vec<f64> = a.iter().map(|&x| x as f64).collect();
            let sb: Vec<f64> = b.iter().map(|&x| x as f64).collect();
            let pa = Subpopulation::new(&vec![0.0; sa.len()], &sa, None).unwrap();
            let pb = Subpopulation::new(&vec![1.0; sb.len()], &sb, None).unwrap();
            let m = WeightedMerge::new(&pa, &pb).unwrap();
            prop_assert_eq!(m.len(), sa.len() + sb.len());
            for w in m.entries().windows(2) {
                prop_assert!(w[0].score < w[1].score);
            }
            let runs = m.runs();
            for w in runs.windows(2) {
                prop_assert!(w[0].origin != w[1].origin);
                prop_assert_eq!(w[0].end, w[1].start);
            }
        }
    }
}
