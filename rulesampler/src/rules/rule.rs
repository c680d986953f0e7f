use super::measures::{compute_measures, Measure};
use super::reducer::CoverReducer;
use crate::data::{Cover, Dataset};
use crate::error::{Result, SamplerError};
use crate::utils::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub type ItemSet = BTreeSet<String>;

/// Per-rule knobs shared by every rule of a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Capacity of the antecedent cover memo (0 disables it).
    pub cache_size_x: usize,
    /// Capacity of the antecedent-plus-consequent cover memo.
    pub cache_size_z: usize,
    pub smooth_counts: f64,
    pub measures: Vec<Measure>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            cache_size_x: 100,
            cache_size_z: 100,
            smooth_counts: 1e-6,
            measures: vec![Measure::Confidence, Measure::Support],
        }
    }
}

/// Mutable association rule X -> Y with its covers, frequencies and
/// measure vector kept in sync after every mutation.
///
/// An empty antecedent covers every transaction; a missing consequent has
/// an empty cover and so does Z. Measures are only evaluated on valid
/// rules, the alternative vector of an invalid rule is all zeros.
#[derive(Clone)]
pub struct RuleState {
    dataset: Arc<Dataset>,
    settings: RuleSettings,
    antecedent: ItemSet,
    consequent: Option<String>,
    cover_x: Cover,
    cover_y: Cover,
    cover_z: Cover,
    freq_x: usize,
    freq_y: usize,
    freq_z: usize,
    alternative: Vec<f64>,
    memo_x: LruCache<ItemSet, Cover>,
    memo_z: LruCache<ItemSet, Cover>,
}

impl RuleState {
    pub fn new(
        antecedent: ItemSet,
        consequent: Option<String>,
        dataset: Arc<Dataset>,
        settings: RuleSettings,
    ) -> Result<Self> {
        let full = dataset.full_cover().clone();
        let mut rule = Self {
            memo_x: LruCache::new(settings.cache_size_x),
            memo_z: LruCache::new(settings.cache_size_z),
            alternative: vec![0.0; settings.measures.len()],
            dataset,
            settings,
            antecedent,
            consequent,
            cover_x: full,
            cover_y: Cover::new(),
            cover_z: Cover::new(),
            freq_x: 0,
            freq_y: 0,
            freq_z: 0,
        };
        rule.refresh_x();
        rule.refresh_y();
        rule.refresh_z();
        rule.update()?;
        Ok(rule)
    }

    /// Rule with no antecedent items and no consequent.
    pub fn empty(dataset: Arc<Dataset>, settings: RuleSettings) -> Result<Self> {
        Self::new(ItemSet::new(), None, dataset, settings)
    }

    /// Adds `item` to X. The Z cover is narrowed with the item cover unless
    /// the memo already knows the resulting set.
    pub fn add_to_x(&mut self, item: &str) -> Result<()> {
        let dataset = Arc::clone(&self.dataset);
        let item_cover = dataset.item_cover(item);
        self.antecedent.insert(item.to_string());

        if let Some(cached) = self.memo_x.get(&self.antecedent) {
            self.cover_x = cached.clone();
        } else {
            narrow(&mut self.cover_x, item_cover);
            self.memo_x.put(self.antecedent.clone(), self.cover_x.clone());
        }

        if self.consequent.is_some() {
            let z_items = self.z_items();
            if let Some(cached) = self.memo_z.get(&z_items) {
                self.cover_z = cached.clone();
            } else {
                narrow(&mut self.cover_z, item_cover);
                self.memo_z.put(z_items, self.cover_z.clone());
            }
        }

        self.update()
    }

    /// Removes `item` from X and recomputes the X and Z covers.
    pub fn remove_from_x(&mut self, item: &str) -> Result<()> {
        if !self.antecedent.remove(item) {
            return Err(SamplerError::ItemNotInAntecedent { item: item.to_string() });
        }
        self.refresh_x();
        self.refresh_z();
        self.update()
    }

    pub fn set_x(&mut self, items: ItemSet) -> Result<()> {
        self.antecedent = items;
        self.refresh_x();
        self.refresh_z();
        self.update()
    }

    pub fn set_y(&mut self, item: Option<String>) -> Result<()> {
        self.consequent = item;
        self.refresh_y();
        self.refresh_z();
        self.update()
    }

    /// Non-empty X, a consequent, and non-zero frequencies for X, Y and Z.
    pub fn is_valid(&self) -> bool {
        !self.antecedent.is_empty()
            && self.consequent.is_some()
            && self.freq_x > 0
            && self.freq_y > 0
            && self.freq_z > 0
    }

    pub fn antecedent(&self) -> &ItemSet {
        &self.antecedent
    }

    pub fn consequent(&self) -> Option<&str> {
        self.consequent.as_deref()
    }

    pub fn freq_x(&self) -> usize {
        self.freq_x
    }

    pub fn freq_y(&self) -> usize {
        self.freq_y
    }

    pub fn freq_z(&self) -> usize {
        self.freq_z
    }

    /// Measure values in the configured order.
    pub fn alternative(&self) -> &[f64] {
        &self.alternative
    }

    pub fn cover_x(&self) -> &Cover {
        &self.cover_x
    }

    pub fn cover_y(&self) -> &Cover {
        &self.cover_y
    }

    pub fn cover_z(&self) -> &Cover {
        &self.cover_z
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    /// Hit rates of the X and Z memos.
    pub fn memo_hit_rates(&self) -> (f64, f64) {
        (self.memo_x.hit_rate(), self.memo_z.hit_rate())
    }

    /// Structural copy without covers or memos.
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            antecedent: self.antecedent.clone(),
            consequent: self.consequent.clone(),
            freq_x: self.freq_x,
            freq_y: self.freq_y,
            freq_z: self.freq_z,
            alternative: self.alternative.clone(),
        }
    }

    fn z_items(&self) -> ItemSet {
        let mut items = self.antecedent.clone();
        if let Some(y) = &self.consequent {
            items.insert(y.clone());
        }
        items
    }

    fn refresh_x(&mut self) {
        self.cover_x = memoized_cover(&mut self.memo_x, &self.antecedent, &self.dataset);
    }

    fn refresh_y(&mut self) {
        self.cover_y = match &self.consequent {
            Some(y) => self.dataset.item_cover(y).cloned().unwrap_or_default(),
            None => Cover::new(),
        };
    }

    fn refresh_z(&mut self) {
        if self.consequent.is_none() {
            self.cover_z = Cover::new();
            return;
        }
        let z_items = self.z_items();
        self.cover_z = memoized_cover(&mut self.memo_z, &z_items, &self.dataset);
    }

    /// Recomputes frequencies and measures from the covers. On error the
    /// previous frequencies and measure vector are left in place.
    fn update(&mut self) -> Result<()> {
        let freq_x = self.cover_x.cardinality();
        let freq_y = self.cover_y.cardinality();
        let freq_z = self.cover_z.cardinality();

        if freq_z > freq_x.min(freq_y) {
            return Err(SamplerError::InvalidState(format!(
                "freq_z {} exceeds min(freq_x {}, freq_y {})",
                freq_z, freq_x, freq_y
            )));
        }

        let valid =
            !self.antecedent.is_empty() && self.consequent.is_some() && freq_x > 0 && freq_y > 0 && freq_z > 0;
        let alternative = if valid {
            compute_measures(
                &self.settings.measures,
                freq_x,
                freq_y,
                freq_z,
                self.dataset.transaction_count(),
                self.settings.smooth_counts,
            )?
        } else {
            vec![0.0; self.settings.measures.len()]
        };

        self.freq_x = freq_x;
        self.freq_y = freq_y;
        self.freq_z = freq_z;
        self.alternative = alternative;
        Ok(())
    }
}

impl fmt::Debug for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleState")
            .field("antecedent", &self.antecedent)
            .field("consequent", &self.consequent)
            .field("freq_x", &self.freq_x)
            .field("freq_y", &self.freq_y)
            .field("freq_z", &self.freq_z)
            .field("alternative", &self.alternative)
            .finish()
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

fn narrow(cover: &mut Cover, item_cover: Option<&Cover>) {
    match item_cover {
        Some(other) => cover.and(other),
        None => *cover = Cover::new(),
    }
}

fn memoized_cover(memo: &mut LruCache<ItemSet, Cover>, items: &ItemSet, dataset: &Dataset) -> Cover {
    if items.is_empty() {
        return dataset.full_cover().clone();
    }
    if let Some(cover) = memo.get(items) {
        return cover.clone();
    }
    let cover = CoverReducer::new(dataset).compute(items);
    memo.put(items.clone(), cover.clone());
    cover
}

/// How two rules are compared when de-duplicating the top-K collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Same antecedent and same consequent.
    #[default]
    ItemSets,
    /// Same item sets, or the same `(freq_x, freq_y, freq_z)` triple.
    ItemSetsOrFrequencies,
}

/// Covers-free copy of a rule, as stored in top-K collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub antecedent: ItemSet,
    pub consequent: Option<String>,
    pub freq_x: usize,
    pub freq_y: usize,
    pub freq_z: usize,
    pub alternative: Vec<f64>,
}

impl RuleSnapshot {
    /// Rebuilds a full rule against the dataset and settings of `context`.
    pub fn expand(&self, context: &RuleState) -> Result<RuleState> {
        RuleState::new(
            self.antecedent.clone(),
            self.consequent.clone(),
            Arc::clone(&context.dataset),
            context.settings.clone(),
        )
    }

    pub fn same_rule(&self, rule: &RuleState, policy: DedupPolicy) -> bool {
        let same_items = self.antecedent == rule.antecedent && self.consequent == rule.consequent;
        match policy {
            DedupPolicy::ItemSets => same_items,
            DedupPolicy::ItemSetsOrFrequencies => {
                same_items
                    || (self.freq_x, self.freq_y, self.freq_z)
                        == (rule.freq_x, rule.freq_y, rule.freq_z)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.antecedent.is_empty()
            && self.consequent.is_some()
            && self.freq_x > 0
            && self.freq_y > 0
            && self.freq_z > 0
    }
}

impl fmt::Display for RuleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<&str> = self.antecedent.iter().map(String::as_str).collect();
        write!(
            f,
            "{{{}}} -> {} (fx={}, fy={}, fz={})",
            items.join(", "),
            self.consequent.as_deref().unwrap_or("?"),
            self.freq_x,
            self.freq_y,
            self.freq_z
        )
    }
}
