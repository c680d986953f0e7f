use super::moves::{valid_rule_score, MoveContext, MovePolicy, SingleFlip};
use super::run::{CancelToken, SampleOutcome, StopReason};
use super::SearchRng;
use crate::config::SamplerConfig;
use crate::data::Dataset;
use crate::error::{Result, SamplerError};
use crate::normalize::Normalizer;
use crate::rules::{RuleSnapshot, RuleState};
use crate::scoring::{CertaintyFunction, ScoreDifference, ScoreFunction};
use crate::utils::TopK;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stochastic local search over association rules.
///
/// A run starts from a random valid rule and, every iteration, lets the
/// move policy propose flips that are kept with the probability given by
/// the certainty function. The best distinct rules seen are returned.
pub struct LocalSearchSampler {
    dataset: Arc<Dataset>,
    config: SamplerConfig,
    scorer: Arc<dyn ScoreFunction>,
    certainty: Box<dyn CertaintyFunction>,
    policy: Box<dyn MovePolicy>,
    normalizer: Normalizer,
    rng: SearchRng,
    cancel: CancelToken,
}

impl LocalSearchSampler {
    pub fn new(dataset: Arc<Dataset>, config: SamplerConfig, scorer: Arc<dyn ScoreFunction>) -> Result<Self> {
        config.validate()?;
        let rng = SearchRng::seed_from_u64(config.seed);
        Ok(Self {
            dataset,
            config,
            scorer,
            certainty: Box::new(ScoreDifference::default()),
            policy: Box::new(SingleFlip),
            normalizer: Normalizer::new(),
            rng,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_certainty(mut self, certainty: impl CertaintyFunction + 'static) -> Self {
        self.certainty = Box::new(certainty);
        self
    }

    pub fn with_policy(mut self, policy: impl MovePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the normalizer, e.g. to carry statistics over from a
    /// previous run.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn into_normalizer(self) -> Normalizer {
        self.normalizer
    }

    /// Score of `rule` under the current normalizer statistics.
    pub fn valid_rule_score(&mut self, rule: &RuleState) -> Result<f64> {
        valid_rule_score(rule, &mut self.normalizer, self.config.normalization, self.scorer.as_ref())
    }

    pub fn sample(&mut self) -> Result<SampleOutcome> {
        let started = Instant::now();
        let deadline = self.config.time_limit.map(|limit| started + limit);
        let settings = self.config.rule_settings();
        let attempts = self.config.seed_attempts;

        let warmup =
            self.dataset.random_valid_rules(&mut self.rng, self.config.warmup_rules, attempts, &settings)?;
        for rule in &warmup {
            self.normalizer.observe(rule.alternative())?;
        }
        debug!(requested = self.config.warmup_rules, drawn = warmup.len(), "normalizer warm-up");
        drop(warmup);

        let mut rule = match self.dataset.random_valid_rule(&mut self.rng, attempts, &settings)? {
            Some(rule) => rule,
            None => {
                warn!(attempts, "no valid seed rule");
                return Err(SamplerError::NoValidSeed { attempts });
            }
        };

        info!(
            seed_rule = %rule,
            policy = self.policy.name(),
            scorer = self.scorer.name(),
            certainty = self.certainty.name(),
            iterations = self.config.maximum_iterations,
            "sampling started"
        );

        let mut top: TopK<RuleSnapshot> = TopK::new(self.config.top_k);
        let seed_score = self.valid_rule_score(&rule)?;
        top.insert(rule.snapshot(), seed_score);

        let mut score_history = Vec::with_capacity(self.config.maximum_iterations.min(1 << 16));
        let mut stop = StopReason::Completed;
        for _ in 0..self.config.maximum_iterations {
            if self.cancel.is_cancelled() {
                stop = StopReason::Cancelled;
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                stop = StopReason::DeadlineExpired;
                break;
            }

            let mut ctx = MoveContext {
                normalizer: &mut self.normalizer,
                method: self.config.normalization,
                rejection: self.config.rejection,
                scorer: self.scorer.as_ref(),
                certainty: self.certainty.as_ref(),
                rng: &mut self.rng,
            };
            self.policy.propose(&mut ctx, &mut rule)?;

            let score = self.valid_rule_score(&rule)?;
            score_history.push(score);

            let dedup = self.config.dedup;
            if rule.is_valid() && !top.contains_by(|kept| kept.same_rule(&rule, dedup)) {
                top.insert(rule.snapshot(), score);
            }
        }

        let iterations = score_history.len();
        let (hit_x, hit_z) = rule.memo_hit_rates();
        debug!(hit_x, hit_z, "cover memo hit rates");

        let mut rules = Vec::with_capacity(top.len());
        let mut scores = Vec::with_capacity(top.len());
        for entry in top.into_vec() {
            rules.push(entry.item.expand(&rule)?);
            scores.push(entry.score);
        }

        match stop {
            StopReason::Completed => {}
            StopReason::DeadlineExpired => warn!(iterations, "sampling deadline expired, returning partial results"),
            StopReason::Cancelled => warn!(iterations, "sampling cancelled, returning partial results"),
        }
        info!(
            iterations,
            kept = rules.len(),
            best_score = scores.first().copied().unwrap_or(0.0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sampling finished"
        );

        Ok(SampleOutcome { rules, scores, iterations, score_history, stop })
    }
}
