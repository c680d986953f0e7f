pub mod certainty;
pub mod history;


pub use certainty::{
    BradleyTerry, CertaintyFunction, Outranking, PairwiseCertainty, PairwiseUncertainty, ScoreDifference,
    Thurstone,
};
pub use history::{AlternativeKey, HistoryAggregator};

use crate::error::Result;
use std::sync::Arc;

/// Maps a rule's measure vector to a single score, higher is better.
///
/// Scoring may keep internal state (see [`HistoryAggregator`]), hence the
/// fallible signature.
pub trait ScoreFunction: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, alternative: &[f64]) -> Result<f64>;
}

impl<T: ScoreFunction + ?Sized> ScoreFunction for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, alternative: &[f64]) -> Result<f64> {
        (**self).score(alternative)
    }
}

/// Weighted sum of the measure values; a plain sum without weights.
/// Missing weights count as zero.
#[derive(Debug, Clone, Default)]
pub struct LinearScore {
    weights: Option<Vec<f64>>,
}

impl LinearScore {
    pub fn new() -> Self {
        Self { weights: None }
    }

    pub fn weighted(weights: Vec<f64>) -> Self {
        Self { weights: Some(weights) }
    }
}

impl ScoreFunction for LinearScore {
    fn name(&self) -> &str {
        "linear"
    }

    fn score(&self, alternative: &[f64]) -> Result<f64> {
        Ok(match &self.weights {
            Some(weights) => alternative.iter().zip(weights).map(|(v, w)| v * w).sum(),
            None => alternative.iter().sum(),
        })
    }
}
