use super::LocalSearchSampler;
use crate::error::Result;
use crate::rules::RuleState;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a sampling run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    DeadlineExpired,
    Cancelled,
}

/// Cooperative cancellation flag, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of one sampling run. When `stop` is not `Completed` the rules
/// are whatever the top-K held at that point.
#[derive(Debug)]
pub struct SampleOutcome {
    /// Best rules first.
    pub rules: Vec<RuleState>,
    /// Score of each rule when it entered the top-K.
    pub scores: Vec<f64>,
    pub iterations: usize,
    /// Score after every iteration.
    pub score_history: Vec<f64>,
    pub stop: StopReason,
}

impl SampleOutcome {
    pub fn is_complete(&self) -> bool {
        self.stop == StopReason::Completed
    }

    pub fn best(&self) -> Option<&RuleState> {
        self.rules.first()
    }
}

/// Runs one independent sampler per seed on the rayon pool. Each run owns
/// its sampler (rule, normalizer, RNG and top-K); only the dataset behind
/// the factory is shared.
pub fn run_independent<F>(seeds: &[u64], factory: F) -> Vec<Result<SampleOutcome>>
where
    F: Fn(u64) -> Result<LocalSearchSampler> + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| {
            let mut sampler = factory(seed)?;
            sampler.sample()
        })
        .collect()
}
