use crate::error::{Result, SamplerError};
use crate::normalize::NormalizationMethod;
use crate::rules::{DedupPolicy, Measure, RuleSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which proposed moves are rejected before the Bernoulli trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionRule {
    /// A new score of exactly zero is always rejected.
    #[default]
    ZeroScore,
    /// Only moves that leave the rule invalid are always rejected; a valid
    /// rule that happens to score zero goes through the certainty test.
    InvalidRule,
}

/// Settings of one local-search sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub maximum_iterations: usize,
    pub top_k: usize,
    pub smooth_counts: f64,
    pub measures: Vec<Measure>,
    pub normalization: NormalizationMethod,
    /// Random valid rules absorbed by the normalizer before the search.
    pub warmup_rules: usize,
    /// Draws per seed before the dataset gives up.
    pub seed_attempts: usize,
    pub cache_size_x: usize,
    pub cache_size_z: usize,
    pub time_limit: Option<Duration>,
    pub dedup: DedupPolicy,
    pub rejection: RejectionRule,
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            maximum_iterations: 1000,
            top_k: 10,
            smooth_counts: 1e-6,
            measures: vec![Measure::Confidence, Measure::Support],
            normalization: NormalizationMethod::MinMax,
            warmup_rules: 100,
            seed_attempts: 1000,
            cache_size_x: 100,
            cache_size_z: 100,
            time_limit: None,
            dedup: DedupPolicy::ItemSets,
            rejection: RejectionRule::ZeroScore,
            seed: 0,
        }
    }
}

impl SamplerConfig {
    pub fn new(maximum_iterations: usize, top_k: usize) -> Self {
        Self { maximum_iterations, top_k, ..Self::default() }
    }

    pub fn with_maximum_iterations(mut self, maximum_iterations: usize) -> Self {
        self.maximum_iterations = maximum_iterations;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_measures(mut self, measures: Vec<Measure>) -> Self {
        self.measures = measures;
        self
    }

    pub fn with_normalization(mut self, normalization: NormalizationMethod) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_smooth_counts(mut self, smooth_counts: f64) -> Self {
        self.smooth_counts = smooth_counts;
        self
    }

    pub fn with_warmup_rules(mut self, warmup_rules: usize) -> Self {
        self.warmup_rules = warmup_rules;
        self
    }

    pub fn with_seed_attempts(mut self, seed_attempts: usize) -> Self {
        self.seed_attempts = seed_attempts;
        self
    }

    pub fn with_cache_sizes(mut self, cache_size_x: usize, cache_size_z: usize) -> Self {
        self.cache_size_x = cache_size_x;
        self.cache_size_z = cache_size_z;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_rejection(mut self, rejection: RejectionRule) -> Self {
        self.rejection = rejection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SamplerError::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.measures.is_empty() {
            return Err(SamplerError::InvalidConfig("at least one measure is required".into()));
        }
        // Without smoothing a rule covering every transaction divides 0 by 0.
        if !self.smooth_counts.is_finite() || self.smooth_counts <= 0.0 {
            return Err(SamplerError::InvalidConfig(format!(
                "smooth_counts must be a positive number, got {}",
                self.smooth_counts
            )));
        }
        if self.seed_attempts == 0 {
            return Err(SamplerError::InvalidConfig("seed_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Rule-level subset of the configuration.
    pub fn rule_settings(&self) -> RuleSettings {
        RuleSettings {
            cache_size_x: self.cache_size_x,
            cache_size_z: self.cache_size_z,
            smooth_counts: self.smooth_counts,
            measures: self.measures.clone(),
        }
    }
}

/// Bounds of a [`crate::scoring::HistoryAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Pairs kept in the ranked history.
    pub max_history: usize,
    /// Most recent vectors new pairs are formed with.
    pub recent_window: usize,
    /// Vectors whose rules stay resolvable.
    pub max_seen: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_history: 1000, recent_window: 10, max_seen: 1000 }
    }
}

/// Settings of a [`crate::sampling::MultivariateSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultivariateConfig {
    /// Inner sampling runs, each adding its best rule to the history.
    pub rounds: usize,
    /// Pairs returned at the end.
    pub top_k: usize,
    /// Iterations of every inner run.
    pub inner_iterations: usize,
    /// Random rules recorded before the first round.
    pub initial_rules: usize,
    pub history: HistoryConfig,
    pub seed: u64,
}

impl Default for MultivariateConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            top_k: 10,
            inner_iterations: 10,
            initial_rules: 10,
            history: HistoryConfig::default(),
            seed: 0,
        }
    }
}

impl MultivariateConfig {
    pub fn new(rounds: usize, top_k: usize) -> Self {
        Self { rounds, top_k, ..Self::default() }
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 || self.history.max_history == 0 {
            return Err(SamplerError::InvalidConfig("top_k and max_history must be at least 1".into()));
        }
        if self.history.recent_window < 2 {
            return Err(SamplerError::InvalidConfig("recent_window must hold at least two vectors".into()));
        }
        Ok(())
    }
}
