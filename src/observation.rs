//! Observations and subpopulations.
//!
//! A [`Subpopulation`] is the validated, column-oriented form of a sequence
//! of `(response, score, weight)` observations. Construction checks lengths,
//! finiteness, and weight positivity; ordering is checked by each operation,
//! since some need strictly increasing scores and others tolerate ties.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats;

/// A single observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub response: f64,
    pub score: f64,
    pub weight: f64,
}

impl Observation {
    /// Builds an observation without validation.
    pub fn new(response: f64, score: f64, weight: f64) -> Self {
        Self {
            response,
            score,
            weight,
        }
    }
}

/// Validated columns of responses, scores, and weights.
///
/// # Examples
/// ```
/// use u_subpop::observation::Subpopulation;
/// let sub = Subpopulation::new(&[1.0, 0.0], &[0.2, 0.7], None).unwrap();
/// assert_eq!(sub.len(), 2);
/// assert_eq!(sub.weights(), &[1.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Subpopulation {
    responses: Vec<f64>,
    scores: Vec<f64>,
    weights: Vec<f64>,
}

impl Subpopulation {
    /// Builds a subpopulation from parallel columns.
    ///
    /// `weights` defaults to uniform `1.0` when `None`.
    ///
    /// # Errors
    /// - [`Error::LengthMismatch`] if the columns differ in length.
    /// - [`Error::NonFinite`] for a NaN/infinite response or score.
    /// - [`Error::InvalidWeight`] for a weight that is not positive and finite.
    pub fn new(responses: &[f64], scores: &[f64], weights: Option<&[f64]>) -> Result<Self> {
        let n = scores.len();
        if responses.len() != n {
            return Err(Error::LengthMismatch {
                column: "responses",
                expected: n,
                actual: responses.len(),
            });
        }
        let weights = match weights {
            Some(w) if w.len() != n => {
                return Err(Error::LengthMismatch {
                    column: "weights",
                    expected: n,
                    actual: w.len(),
                });
            }
            Some(w) => w.to_vec(),
            None => vec![1.0; n],
        };
        check_finite("score", scores)?;
        check_finite("response", responses)?;
        stats::validate_weights(&weights)?;
        Ok(Self {
            responses: responses.to_vec(),
            scores: scores.to_vec(),
            weights,
        })
    }

    /// Wraps columns already known to be valid, e.g. a reordering of a
    /// validated subpopulation.
    pub(crate) fn from_columns_unchecked(
        responses: Vec<f64>,
        scores: Vec<f64>,
        weights: Vec<f64>,
    ) -> Self {
        debug_assert!(responses.len() == scores.len() && weights.len() == scores.len());
        Self {
            responses,
            scores,
            weights,
        }
    }

    /// Builds a subpopulation from observations, in the given order.
    pub fn from_observations(observations: &[Observation]) -> Result<Self> {
        let responses: Vec<f64> = observations.iter().map(|o| o.response).collect();
        let scores: Vec<f64> = observations.iter().map(|o| o.score).collect();
        let weights: Vec<f64> = observations.iter().map(|o| o.weight).collect();
        Self::new(&responses, &scores, Some(&weights))
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether there are no observations.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Response column.
    pub fn responses(&self) -> &[f64] {
        &self.responses
    }

    /// Score column.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Weight column.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The `i`-th observation.
    pub fn get(&self, i: usize) -> Option<Observation> {
        (i < self.len()).then(|| Observation::new(self.responses[i], self.scores[i], self.weights[i]))
    }

    /// Observations in order.
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        (0..self.len()).map(|i| Observation::new(self.responses[i], self.scores[i], self.weights[i]))
    }

    /// Total weight.
    pub fn total_weight(&self) -> f64 {
        stats::kahan_sum(&self.weights)
    }

    /// Copy with the scores replaced, keeping responses and weights.
    ///
    /// Used to rerun a comparison on undithered scores.
    pub fn with_scores(&self, scores: &[f64]) -> Result<Self> {
        Self::new(&self.responses, scores, Some(&self.weights))
    }

    /// Copy with the responses replaced, keeping scores and weights.
    pub fn with_responses(&self, responses: &[f64]) -> Result<Self> {
        Self::new(responses, &self.scores, Some(&self.weights))
    }

    /// Observations at `positions`, in that order.
    ///
    /// # Errors
    /// [`Error::IndexOutOfBounds`] for a position past the end.
    pub fn select(&self, positions: &[usize]) -> Result<Self> {
        let mut responses = Vec::with_capacity(positions.len());
        let mut scores = Vec::with_capacity(positions.len());
        let mut weights = Vec::with_capacity(positions.len());
        for &p in positions {
            if p >= self.len() {
                return Err(Error::IndexOutOfBounds {
                    index: p,
                    len: self.len(),
                });
            }
            responses.push(self.responses[p]);
            scores.push(self.scores[p]);
            weights.push(self.weights[p]);
        }
        Ok(Self {
            responses,
            scores,
            weights,
        })
    }
}

fn check_finite(field: &'static str, data: &[f64]) -> Result<()> {
    match data.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(Error::NonFinite {
            field,
            index,
            value: data[index],
        }),
        None => Ok(()),
    }
}
