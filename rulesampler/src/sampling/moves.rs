use super::SearchRng;
use crate::config::RejectionRule;
use crate::data::Dataset;
use crate::error::Result;
use crate::normalize::{NormalizationMethod, Normalizer};
use crate::rules::RuleState;
use crate::scoring::{CertaintyFunction, ScoreFunction};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// Scores a rule after rescaling its measure vector, without touching the
/// normalizer statistics. Invalid rules score 0 and never reach `scorer`.
pub fn valid_rule_score(
    rule: &RuleState,
    normalizer: &mut Normalizer,
    method: NormalizationMethod,
    scorer: &dyn ScoreFunction,
) -> Result<f64> {
    if !rule.is_valid() {
        return Ok(0.0);
    }
    let normalized = normalizer.normalize(rule.alternative(), method, false)?;
    scorer.score(&normalized)
}

/// Everything a move policy needs from the running sampler.
pub struct MoveContext<'s> {
    pub(crate) normalizer: &'s mut Normalizer,
    pub(crate) method: NormalizationMethod,
    pub(crate) rejection: RejectionRule,
    pub(crate) scorer: &'s dyn ScoreFunction,
    pub(crate) certainty: &'s dyn CertaintyFunction,
    pub(crate) rng: &'s mut SearchRng,
}

impl MoveContext<'_> {
    pub fn rng(&mut self) -> &mut SearchRng {
        &mut *self.rng
    }

    /// Folds the rule's current vector into the normalizer statistics.
    pub fn observe(&mut self, rule: &RuleState) -> Result<()> {
        self.normalizer.observe(rule.alternative())
    }

    pub fn score(&mut self, rule: &RuleState) -> Result<f64> {
        valid_rule_score(rule, &mut *self.normalizer, self.method, self.scorer)
    }

    /// Bernoulli trial on the certainty that the new state outranks the old
    /// one, after the configured outright rejection.
    pub fn accepts(&mut self, rule: &RuleState, new_score: f64, old_score: f64) -> bool {
        let rejected = match self.rejection {
            RejectionRule::ZeroScore => new_score == 0.0,
            RejectionRule::InvalidRule => !rule.is_valid(),
        };
        let certainty = if rejected { 0.0 } else { self.certainty.certainty(new_score, old_score) };
        let p = if certainty.is_nan() { 0.0 } else { certainty.clamp(0.0, 1.0) };
        self.rng.gen_bool(p)
    }

    /// Tries the candidates in order, adding each to X until one is
    /// accepted. A rejected candidate is removed again, so an item that was
    /// already in X and gets rejected leaves the antecedent.
    pub fn scan_antecedents<'c>(
        &mut self,
        rule: &mut RuleState,
        candidates: impl IntoIterator<Item = &'c String>,
    ) -> Result<Option<String>> {
        for item in candidates {
            self.observe(rule)?;
            let original = self.score(rule)?;
            rule.add_to_x(item)?;
            let modified = self.score(rule)?;

            if self.accepts(rule, modified, original) {
                trace!(item = %item, original, modified, "antecedent move accepted");
                return Ok(Some(item.clone()));
            }
            rule.remove_from_x(item)?;
        }
        Ok(None)
    }

    /// Same protocol as [`MoveContext::scan_antecedents`] on the consequent,
    /// restoring the previous consequent on rejection.
    pub fn scan_consequents<'c>(
        &mut self,
        rule: &mut RuleState,
        candidates: impl IntoIterator<Item = &'c String>,
    ) -> Result<Option<String>> {
        for item in candidates {
            self.observe(rule)?;
            let original = self.score(rule)?;
            let previous = rule.consequent().map(str::to_string);
            rule.set_y(Some(item.clone()))?;
            let modified = self.score(rule)?;

            if self.accepts(rule, modified, original) {
                trace!(item = %item, original, modified, "consequent move accepted");
                return Ok(Some(item.clone()));
            }
            rule.set_y(previous)?;
        }
        Ok(None)
    }

    /// Tentatively drops a random half of X (rounded down) as one move.
    /// Returns whether the halving was kept.
    pub fn try_halve(&mut self, rule: &mut RuleState) -> Result<bool> {
        let mut items: Vec<String> = rule.antecedent().iter().cloned().collect();
        items.shuffle(&mut *self.rng);
        items.truncate(items.len() / 2);
        if items.is_empty() {
            return Ok(false);
        }

        let original = self.score(rule)?;
        for item in &items {
            rule.remove_from_x(item)?;
        }
        let modified = self.score(rule)?;

        if self.accepts(rule, modified, original) {
            trace!(removed = items.len(), original, modified, "antecedent halving accepted");
            return Ok(true);
        }
        for item in &items {
            rule.add_to_x(item)?;
        }
        Ok(false)
    }
}

/// Generates one iteration's move on `rule`.
pub trait MovePolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn propose(&self, ctx: &mut MoveContext<'_>, rule: &mut RuleState) -> Result<()>;
}

/// Independent random orders over the antecedent and consequent items.
fn shuffled_orders(rng: &mut SearchRng, dataset: &Dataset) -> (Vec<usize>, Vec<usize>) {
    let mut antecedents: Vec<usize> = (0..dataset.antecedent_items().len()).collect();
    let mut consequents: Vec<usize> = (0..dataset.consequent_items().len()).collect();
    antecedents.shuffle(rng);
    consequents.shuffle(rng);
    (antecedents, consequents)
}

fn scan_both(
    ctx: &mut MoveContext<'_>,
    rule: &mut RuleState,
    dataset: &Dataset,
    antecedents: &[usize],
    consequents: &[usize],
) -> Result<()> {
    let antecedent_items = dataset.antecedent_items();
    let consequent_items = dataset.consequent_items();
    ctx.scan_antecedents(rule, antecedents.iter().map(|&i| &antecedent_items[i]))?;
    ctx.scan_consequents(rule, consequents.iter().map(|&i| &consequent_items[i]))?;
    Ok(())
}

/// At most one antecedent flip and one consequent flip per iteration,
/// first accepted candidate wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleFlip;

impl MovePolicy for SingleFlip {
    fn name(&self) -> &'static str {
        "single_flip"
    }

    fn propose(&self, ctx: &mut MoveContext<'_>, rule: &mut RuleState) -> Result<()> {
        let dataset = Arc::clone(rule.dataset());
        let (antecedents, consequents) = shuffled_orders(ctx.rng(), &dataset);
        scan_both(ctx, rule, &dataset, &antecedents, &consequents)
    }
}

/// [`SingleFlip`] preceded by an attempt to drop half of the antecedent at
/// once, letting the search escape from long antecedents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalvingBatch;

impl MovePolicy for HalvingBatch {
    fn name(&self) -> &'static str {
        "halving_batch"
    }

    fn propose(&self, ctx: &mut MoveContext<'_>, rule: &mut RuleState) -> Result<()> {
        let dataset = Arc::clone(rule.dataset());
        let (antecedents, consequents) = shuffled_orders(ctx.rng(), &dataset);
        ctx.try_halve(rule)?;
        scan_both(ctx, rule, &dataset, &antecedents, &consequents)
    }
}
