//! Multiple importance sampling weights.

use serde::{Deserialize, Serialize};

/// MIS weighting function.
///
/// The same heuristic must be used where light samples are weighted
/// against the BRDF pdf and where BRDF-sampled hits are weighted against
/// the light pdf, otherwise the two estimators no longer sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisHeuristic {
    /// `w = n0 p0 / (n0 p0 + n1 p1)`
    Balance,
    /// `w = (n0 p0)^b / ((n0 p0)^b + (n1 p1)^b)`
    Power { exponent: f32 },
}

impl Default for MisHeuristic {
    fn default() -> Self {
        MisHeuristic::Power { exponent: 2.0 }
    }
}

impl MisHeuristic {
    /// Weight of strategy 0 given `n0` samples at pdf `p0` and `n1` samples
    /// of the competing strategy at pdf `p1`.
    ///
    /// Returns 0 when neither strategy can produce the sample.
    #[inline]
    pub fn weight_n(self, n0: f32, p0: f32, n1: f32, p1: f32) -> f32 {
        let q0 = n0 * p0;
        let q1 = n1 * p1;
        let (a, b) = match self {
            MisHeuristic::Balance => (q0, q1),
            MisHeuristic::Power { exponent } if exponent == 2.0 => (q0 * q0, q1 * q1),
            MisHeuristic::Power { exponent } => (q0.powf(exponent), q1.powf(exponent)),
        };
        let sum = a + b;
        if sum > 0.0 && sum.is_finite() {
            a / sum
        } else if a.is_infinite() && b.is_finite() {
            1.0
        } else {
            0.0
        }
    }

    /// One sample of each strategy.
    #[inline]
    pub fn weight(self, p0: f32, p1: f32) -> f32 {
        self.weight_n(1.0, p0, 1.0, p1)
    }
}
