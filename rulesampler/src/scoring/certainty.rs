use super::ScoreFunction;
use crate::error::Result;
use statrs::distribution::{ContinuousCDF, Normal};

/// Confidence that an alternative scored `score0` outranks one scored
/// `score1`. Implementations aim for [0, 1]; the sampler clamps whatever
/// falls outside before using it as a probability.
pub trait CertaintyFunction: Send + Sync {
    fn name(&self) -> &str;
    fn certainty(&self, score0: f64, score1: f64) -> f64;
}

/// Affine map of the score difference, floored at `eps` so that a worse
/// move is never ruled out entirely.
#[derive(Debug, Clone, Copy)]
pub struct ScoreDifference {
    pub eps: f64,
}

impl Default for ScoreDifference {
    fn default() -> Self {
        Self { eps: 0.001 }
    }
}

impl CertaintyFunction for ScoreDifference {
    fn name(&self) -> &str {
        "ScoreDifferenceOutRanking"
    }

    fn certainty(&self, score0: f64, score1: f64) -> f64 {
        (1.0 - self.eps) * ((score0 - score1) / 2.0 + 0.5) + self.eps
    }
}

/// `e^s0 / (e^s0 + e^s1)`, evaluated as a logistic to avoid overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct BradleyTerry;

impl CertaintyFunction for BradleyTerry {
    fn name(&self) -> &str {
        "BradleyTerryOutRanking"
    }

    fn certainty(&self, score0: f64, score1: f64) -> f64 {
        1.0 / (1.0 + (score1 - score0).exp())
    }
}

/// `P(X <= score0)` for `X ~ N(score1, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Thurstone {
    normal: Normal,
}

impl Default for Thurstone {
    fn default() -> Self {
        Self { normal: Normal::standard() }
    }
}

impl CertaintyFunction for Thurstone {
    fn name(&self) -> &str {
        "ThurstoneOutRanking"
    }

    fn certainty(&self, score0: f64, score1: f64) -> f64 {
        self.normal.cdf(score0 - score1)
    }
}

/// Compares two measure vectors directly.
pub trait PairwiseCertainty: Send + Sync {
    fn name(&self) -> &str;
    fn compare(&self, first: &[f64], second: &[f64]) -> Result<f64>;
}

/// Scores both vectors, then applies a [`CertaintyFunction`] to the scores.
pub struct Outranking<S, C> {
    scorer: S,
    certainty: C,
    name: String,
}

impl<S: ScoreFunction, C: CertaintyFunction> Outranking<S, C> {
    pub fn new(scorer: S, certainty: C) -> Self {
        let name = format!("{}({})", certainty.name(), scorer.name());
        Self { scorer, certainty, name }
    }
}

impl<S: ScoreFunction, C: CertaintyFunction> PairwiseCertainty for Outranking<S, C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn compare(&self, first: &[f64], second: &[f64]) -> Result<f64> {
        let score0 = self.scorer.score(first)?;
        let score1 = self.scorer.score(second)?;
        Ok(self.certainty.certainty(score0, score1))
    }
}

/// `1 - |1 - 2θ|`: highest when the wrapped certainty θ is a coin flip,
/// zero when it is certain either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseUncertainty<C> {
    inner: C,
}

impl<C> PairwiseUncertainty<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    fn uncertainty(theta: f64) -> f64 {
        1.0 - (1.0 - 2.0 * theta).abs()
    }
}

impl<C: CertaintyFunction> CertaintyFunction for PairwiseUncertainty<C> {
    fn name(&self) -> &str {
        "PairwiseUncertainty"
    }

    fn certainty(&self, score0: f64, score1: f64) -> f64 {
        Self::uncertainty(self.inner.certainty(score0, score1))
    }
}

impl<C: PairwiseCertainty> PairwiseCertainty for PairwiseUncertainty<C> {
    fn name(&self) -> &str {
        "PairwiseUncertainty"
    }

    fn compare(&self, first: &[f64], second: &[f64]) -> Result<f64> {
        Ok(Self::uncertainty(self.inner.compare(first, second)?))
    }
}
