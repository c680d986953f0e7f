use super::{LocalSearchSampler, SearchRng};
use crate::config::{MultivariateConfig, SamplerConfig};
use crate::data::Dataset;
use crate::error::Result;
use crate::normalize::Normalizer;
use crate::rules::RuleSnapshot;
use crate::scoring::{HistoryAggregator, PairwiseCertainty, ScoreFunction};
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Samples pairs of rules whose comparison is most informative under a
/// pairwise certainty.
///
/// Each round runs a short top-1 local search scored by a
/// [`HistoryAggregator`] and records the round's best rule in that
/// aggregator, so later rounds are steered by the pairs found so far.
pub struct MultivariateSampler<P: PairwiseCertainty + 'static> {
    aggregator: Arc<HistoryAggregator<P>>,
    inner: LocalSearchSampler,
    config: MultivariateConfig,
}

impl<P: PairwiseCertainty + 'static> MultivariateSampler<P> {
    /// `sampler_config` shapes the inner runs; its `top_k` and
    /// `maximum_iterations` are overridden by `config`.
    pub fn new(
        dataset: Arc<Dataset>,
        pairwise: P,
        sampler_config: SamplerConfig,
        config: MultivariateConfig,
    ) -> Result<Self> {
        config.validate()?;
        let settings = sampler_config.rule_settings();
        let mut rng = SearchRng::seed_from_u64(config.seed);
        let initial =
            dataset.random_valid_rules(&mut rng, config.initial_rules, sampler_config.seed_attempts, &settings)?;

        let name = format!("{}Singlevariate", pairwise.name());
        let aggregator = Arc::new(HistoryAggregator::new(name, pairwise, Normalizer::new(), &config.history));
        for rule in &initial {
            aggregator.add_to_history(rule.alternative(), rule.snapshot())?;
        }
        debug!(initial = initial.len(), "history seeded");

        let inner_config = sampler_config
            .with_top_k(1)
            .with_maximum_iterations(config.inner_iterations)
            .with_seed(config.seed.wrapping_add(1));
        let scorer: Arc<dyn ScoreFunction> = aggregator.clone();
        let inner = LocalSearchSampler::new(dataset, inner_config, scorer)?;

        Ok(Self { aggregator, inner, config })
    }

    /// Runs every round and returns the best pairs of the history.
    pub fn sample(&mut self) -> Result<Vec<(RuleSnapshot, RuleSnapshot)>> {
        for round in 0..self.config.rounds {
            let outcome = self.inner.sample()?;
            if let Some(best) = outcome.best() {
                self.aggregator.add_to_history(best.alternative(), best.snapshot())?;
            }
            debug!(round, history = self.aggregator.history_len(), "round finished");
        }

        let pairs = self.aggregator.top_k(self.config.top_k);
        info!(rounds = self.config.rounds, pairs = pairs.len(), "multivariate sampling finished");
        Ok(pairs)
    }

    pub fn aggregator(&self) -> &HistoryAggregator<P> {
        &self.aggregator
    }

    pub fn inner(&self) -> &LocalSearchSampler {
        &self.inner
    }
}
