use super::certainty::PairwiseCertainty;
use super::ScoreFunction;
use crate::config::HistoryConfig;
use crate::error::Result;
use crate::normalize::{NormalizationMethod, Normalizer};
use crate::rules::RuleSnapshot;
use crate::utils::{LruCache, TopK};
use parking_lot::Mutex;
use tracing::debug;

/// Hashable identity of a measure vector (bitwise, so `-0.0 != 0.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlternativeKey(Vec<u64>);

impl AlternativeKey {
    pub fn new(alternative: &[f64]) -> Self {
        Self(alternative.iter().map(|v| v.to_bits()).collect())
    }

    pub fn vector(&self) -> Vec<f64> {
        self.0.iter().map(|bits| f64::from_bits(*bits)).collect()
    }
}

#[derive(Debug, Clone)]
struct HistoryPair {
    first: AlternativeKey,
    second: AlternativeKey,
}

struct HistoryState {
    normalizer: Normalizer,
    seen: LruCache<AlternativeKey, RuleSnapshot>,
    recent: LruCache<AlternativeKey, ()>,
    pairs: TopK<HistoryPair>,
}

/// Turns a pairwise certainty into a single-valued score.
///
/// A vector scores the best pairwise certainty it reaches against the most
/// recently recorded vectors (0 when there is nothing to compare with).
/// Recorded vectors are paired with that same window and the pairs are kept
/// in a bounded history ranked by their certainty at insertion time.
///
/// All state sits behind one mutex, so a single aggregator can score rules
/// for several samplers at once.
pub struct HistoryAggregator<P> {
    name: String,
    pairwise: P,
    state: Mutex<HistoryState>,
}

impl<P: PairwiseCertainty> HistoryAggregator<P> {
    /// `normalizer` rescales vectors (min-max) before comparing them; its
    /// statistics grow with every scored vector.
    pub fn new(name: impl Into<String>, pairwise: P, normalizer: Normalizer, config: &HistoryConfig) -> Self {
        Self {
            name: name.into(),
            pairwise,
            state: Mutex::new(HistoryState {
                normalizer,
                seen: LruCache::new(config.max_seen),
                recent: LruCache::new(config.recent_window),
                pairs: TopK::new(config.max_history),
            }),
        }
    }

    /// Records `alternative` (and the rule it came from) and pairs it with
    /// every other vector of the recent window.
    pub fn add_to_history(&self, alternative: &[f64], rule: RuleSnapshot) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let key = AlternativeKey::new(alternative);

        state.seen.put(key.clone(), rule);
        state.recent.put(key.clone(), ());

        let partners: Vec<AlternativeKey> = state.recent.keys().filter(|k| **k != key).cloned().collect();
        for partner in partners {
            let score = self.pair_score(&mut state.normalizer, alternative, &partner.vector())?;
            state.pairs.insert(HistoryPair { first: key.clone(), second: partner }, score);
        }
        debug!(pairs = state.pairs.len(), seen = state.seen.len(), "history updated");
        Ok(())
    }

    /// Up to `k` best pairs whose rules are both still known, best first.
    pub fn top_k(&self, k: usize) -> Vec<(RuleSnapshot, RuleSnapshot)> {
        let state = self.state.lock();
        state
            .pairs
            .iter()
            .filter_map(|entry| {
                let first = state.seen.peek(&entry.item.first)?;
                let second = state.seen.peek(&entry.item.second)?;
                Some((first.clone(), second.clone()))
            })
            .take(k)
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().pairs.len()
    }

    pub fn seen_len(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// Samples absorbed by the aggregator's normalizer.
    pub fn normalized_samples(&self) -> usize {
        self.state.lock().normalizer.sample_count()
    }

    fn pair_score(&self, normalizer: &mut Normalizer, first: &[f64], second: &[f64]) -> Result<f64> {
        let first = normalizer.normalize(first, NormalizationMethod::MinMax, false)?;
        let second = normalizer.normalize(second, NormalizationMethod::MinMax, false)?;
        self.pairwise.compare(&first, &second)
    }
}

impl<P: PairwiseCertainty> ScoreFunction for HistoryAggregator<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, alternative: &[f64]) -> Result<f64> {
        let mut guard = self.state.lock();
        let HistoryState { normalizer, recent, .. } = &mut *guard;
        normalizer.observe(alternative)?;

        let key = AlternativeKey::new(alternative);
        let mut best: Option<f64> = None;
        for other in recent.keys().filter(|k| **k != key) {
            let score = self.pair_score(normalizer, alternative, &other.vector())?;
            best = Some(best.map_or(score, |b: f64| b.max(score)));
        }
        Ok(best.unwrap_or(0.0))
    }
}
