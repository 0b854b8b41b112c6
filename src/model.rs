//! Hashed linear scorer and its adaptive-gradient update.

use crate::errors::{ensure_finite, ParserError, Result};
use crate::transition::ActionType;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Sparse gradient accumulator keyed by weight index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradient {
    entries: FxHashMap<usize, f64>,
}

impl Gradient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to entry `index`
    pub fn add(&mut self, index: usize, value: f64) {
        *self.entries.entry(index).or_insert(0.0) += value;
    }

    /// Value at `index` (0 if never touched)
    pub fn get(&self, index: usize) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Number of touched entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Touched entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&i, &v)| (i, v))
    }

    /// Sum of absolute values
    pub fn l1_norm(&self) -> f64 {
        self.entries.values().map(|v| v.abs()).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Weight table plus per-entry sums of squared gradients.
///
/// `score(features, a) = Σ theta[(f * 4 + a) mod dim]`; collisions are part
/// of the model. Deserialization goes through [`WeightVector::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightParts")]
pub struct WeightVector {
    theta: Vec<f64>,
    sum_squares: Vec<f64>,
    epsilon: f64,
}

#[derive(Deserialize)]
struct WeightParts {
    theta: Vec<f64>,
    sum_squares: Vec<f64>,
    epsilon: f64,
}

impl TryFrom<WeightParts> for WeightVector {
    type Error = ParserError;

    fn try_from(parts: WeightParts) -> Result<Self> {
        Self::from_parts(parts.theta, parts.sum_squares, parts.epsilon)
    }
}

impl WeightVector {
    /// Zero weights of dimension `dim`
    pub fn new(dim: usize, epsilon: f64) -> Result<Self> {
        if dim == 0 {
            return Err(ParserError::invalid_config("weight vector must not be empty"));
        }
        Ok(Self {
            theta: vec![0.0; dim],
            sum_squares: vec![0.0; dim],
            epsilon,
        })
    }

    /// Restore from a checkpoint
    pub fn from_parts(theta: Vec<f64>, sum_squares: Vec<f64>, epsilon: f64) -> Result<Self> {
        if theta.is_empty() {
            return Err(ParserError::invalid_config("weight vector must not be empty"));
        }
        if theta.len() != sum_squares.len() {
            return Err(ParserError::DimensionMismatch {
                expected: theta.len(),
                actual: sum_squares.len(),
            });
        }
        if let Some(&bad) = theta.iter().chain(&sum_squares).find(|v| !v.is_finite()) {
            return Err(ParserError::non_finite("restored weights", bad));
        }
        Ok(Self {
            theta,
            sum_squares,
            epsilon,
        })
    }

    pub fn dim(&self) -> usize {
        self.theta.len()
    }

    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    pub fn sum_squares(&self) -> &[f64] {
        &self.sum_squares
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Same weights and accumulators under a different epsilon
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Split into `(theta, sum_squares)` for checkpointing
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.theta, self.sum_squares)
    }

    /// Table slot of feature `key` under `action`
    #[inline]
    pub fn index(&self, key: u64, action: ActionType) -> usize {
        let slot = key.wrapping_mul(4).wrapping_add(action.index());
        (slot % self.theta.len() as u64) as usize
    }

    /// Local score of taking `action` in a configuration with `features`
    pub fn score(&self, features: &[u64], action: ActionType) -> f64 {
        features
            .iter()
            .map(|&f| self.theta[self.index(f, action)])
            .sum()
    }

    /// Add `scale` to the gradient slot of every feature under `action`
    pub fn accumulate(&self, grad: &mut Gradient, features: &[u64], action: ActionType, scale: f64) {
        for &f in features {
            grad.add(self.index(f, action), scale);
        }
    }

    /// One adaptive step:
    /// `theta[i] += lr * g / sqrt(ss[i] + eps)`, then `ss[i] += g^2`.
    ///
    /// Every new value is computed and checked before any is written, so a
    /// non-finite result leaves the vector untouched. Returns the number of
    /// entries updated.
    pub fn apply_adagrad(&mut self, grad: &Gradient, learning_rate: f64) -> Result<usize> {
        let mut updates = Vec::with_capacity(grad.len());
        for (i, g) in grad.iter() {
            if g == 0.0 {
                continue;
            }
            if i >= self.theta.len() {
                return Err(ParserError::DimensionMismatch {
                    expected: self.theta.len(),
                    actual: i + 1,
                });
            }
            ensure_finite("gradient", g)?;
            let step = learning_rate * g / (self.sum_squares[i] + self.epsilon).sqrt();
            let theta = ensure_finite("adaptive update", self.theta[i] + step)?;
            let sum_sq = ensure_finite("squared gradient sum", self.sum_squares[i] + g * g)?;
            updates.push((i, theta, sum_sq));
        }

        for &(i, theta, sum_sq) in &updates {
            self.theta[i] = theta;
            self.sum_squares[i] = sum_sq;
        }
        trace_debug!(entries = updates.len(), "applied adaptive update");
        Ok(updates.len())
    }
}
