use super::SearchRng;
use crate::data::Dataset;
use crate::error::Result;
use crate::rules::{RuleSettings, RuleState};
use crate::scoring::AlternativeKey;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Largest antecedent a random draw may propose.
pub const DEFAULT_MAX_ANTECEDENT: usize = 5;

/// Uniform baseline: draws rules without any scoring and keeps those with a
/// measure vector not seen before.
///
/// A draw picks the consequent uniformly, then a target antecedent size in
/// `1..=max_antecedent`. The first antecedent item is uniform over all
/// antecedent items; each further slot picks uniformly among the items that
/// keep the rule valid, plus one extra option that ends the antecedent.
pub struct RandomSampler {
    dataset: Arc<Dataset>,
    settings: RuleSettings,
    max_antecedent: usize,
    draws_per_rule: usize,
}

impl RandomSampler {
    pub fn new(dataset: Arc<Dataset>, settings: RuleSettings) -> Self {
        Self { dataset, settings, max_antecedent: DEFAULT_MAX_ANTECEDENT, draws_per_rule: 100 }
    }

    pub fn with_max_antecedent(mut self, max_antecedent: usize) -> Self {
        self.max_antecedent = max_antecedent.max(1);
        self
    }

    /// Draws allowed per requested rule before the run gives up.
    pub fn with_draws_per_rule(mut self, draws: usize) -> Self {
        self.draws_per_rule = draws.max(1);
        self
    }

    /// Up to `count` valid rules with pairwise distinct measure vectors.
    /// Returns fewer when the draw budget runs out first.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Result<Vec<RuleState>> {
        let mut rules = Vec::with_capacity(count.min(1024));
        let mut seen = HashSet::new();
        if self.dataset.consequent_items().is_empty() || self.dataset.antecedent_items().is_empty() {
            return Ok(rules);
        }

        let budget = count.saturating_mul(self.draws_per_rule);
        let mut draws = 0;
        while rules.len() < count && draws < budget {
            draws += 1;
            let rule = self.draw(rng)?;
            if rule.is_valid() && seen.insert(AlternativeKey::new(rule.alternative())) {
                rules.push(rule);
            }
        }

        if rules.len() < count {
            debug!(draws, kept = rules.len(), count, "random sampling exhausted its draw budget");
        }
        Ok(rules)
    }

    /// Splits `count` across one seeded task per entry of `seeds` on the
    /// rayon pool and merges the results, dropping repeated measure vectors.
    pub fn sample_parallel(&self, seeds: &[u64], count: usize) -> Result<Vec<RuleState>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let per_task = count.div_ceil(seeds.len());
        let batches = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = SearchRng::seed_from_u64(seed);
                self.sample(&mut rng, per_task)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(count.min(1024));
        for rule in batches.into_iter().flatten() {
            if rules.len() == count {
                break;
            }
            if seen.insert(AlternativeKey::new(rule.alternative())) {
                rules.push(rule);
            }
        }
        info!(tasks = seeds.len(), kept = rules.len(), count, "parallel random sampling finished");
        Ok(rules)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RuleState> {
        let mut rule = RuleState::empty(Arc::clone(&self.dataset), self.settings.clone())?;
        let consequent = self.dataset.consequent_items().choose(rng).cloned();
        rule.set_y(consequent)?;

        let target = rng.gen_range(1..=self.max_antecedent);
        let mut available: Vec<&String> = self.dataset.antecedent_items().iter().collect();

        let first = rng.gen_range(0..available.len());
        let item = available.swap_remove(first);
        rule.add_to_x(item)?;

        while rule.antecedent().len() < target && !available.is_empty() {
            let mut candidates = Vec::new();
            for (idx, item) in available.iter().enumerate() {
                rule.add_to_x(item)?;
                if rule.is_valid() {
                    candidates.push(idx);
                }
                rule.remove_from_x(item)?;
            }

            // One extra slot stands for ending the antecedent here.
            let pick = rng.gen_range(0..=candidates.len());
            match candidates.get(pick) {
                Some(&idx) => {
                    let item = available.swap_remove(idx);
                    rule.add_to_x(item)?;
                }
                None => break,
            }
        }
        Ok(rule)
    }
}
