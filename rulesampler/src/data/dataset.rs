use super::cover::Cover;
use crate::error::{Result, SamplerError};
use crate::rules::{RuleSettings, RuleState};
use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Transactional dataset encoded as one cover per item value.
///
/// Built once and then shared read-only (behind an `Arc`) by every rule and
/// every sampling run.
#[derive(Debug)]
pub struct Dataset {
    transactions: Vec<Vec<String>>,
    item_covers: HashMap<String, Cover>,
    antecedent_items: Vec<String>,
    consequent_items: Vec<String>,
    consequent_set: HashSet<String>,
    full_cover: Cover,
}

impl Dataset {
    /// Builds the item covers from string transactions. Items listed in
    /// `consequent_items` may only appear on the right-hand side of a rule,
    /// every other item is antecedent-eligible.
    pub fn new<S: AsRef<str>>(transactions: &[Vec<S>], consequent_items: &[S]) -> Result<Self> {
        let transactions: Vec<Vec<String>> = transactions
            .iter()
            .map(|tx| tx.iter().map(|item| item.as_ref().to_string()).collect())
            .collect();
        let consequents = consequent_items.iter().map(|item| item.as_ref().to_string());
        Self::from_transactions(transactions, consequents)
    }

    /// Builds a dataset from a binary transaction matrix (rows are
    /// transactions, non-zero cells mark present items). The column index
    /// becomes the item value.
    pub fn from_matrix(matrix: ArrayView2<i32>, consequent_columns: &[usize]) -> Result<Self> {
        let num_transactions = matrix.shape()[0];
        let num_items = matrix.shape()[1];

        let transactions: Vec<Vec<String>> = (0..num_transactions)
            .map(|i| {
                (0..num_items)
                    .filter(|&j| matrix[[i, j]] != 0)
                    .map(|j| j.to_string())
                    .collect()
            })
            .collect();
        let consequents = consequent_columns.iter().map(|col| col.to_string());
        Self::from_transactions(transactions, consequents)
    }

    fn from_transactions(
        transactions: Vec<Vec<String>>,
        consequent_items: impl Iterator<Item = String>,
    ) -> Result<Self> {
        if transactions.is_empty() {
            return Err(SamplerError::EmptyDataset);
        }

        let mut item_covers: HashMap<String, Cover> = HashMap::new();
        for (tid, transaction) in transactions.iter().enumerate() {
            for item in transaction {
                item_covers.entry(item.clone()).or_default().set(tid);
            }
        }

        let consequent_set: HashSet<String> = consequent_items.collect();
        let mut consequent_items: Vec<String> = consequent_set.iter().cloned().collect();
        consequent_items.sort_unstable();

        let mut antecedent_items: Vec<String> = item_covers
            .keys()
            .filter(|item| !consequent_set.contains(*item))
            .cloned()
            .collect();
        antecedent_items.sort_unstable();

        let full_cover = Cover::all_ones(transactions.len());

        debug!(
            transactions = transactions.len(),
            antecedent_items = antecedent_items.len(),
            consequent_items = consequent_items.len(),
            "dataset built"
        );

        Ok(Self {
            transactions,
            item_covers,
            antecedent_items,
            consequent_items,
            consequent_set,
            full_cover,
        })
    }

    pub fn item_cover(&self, item: &str) -> Option<&Cover> {
        self.item_covers.get(item)
    }

    pub fn antecedent_items(&self) -> &[String] {
        &self.antecedent_items
    }

    pub fn consequent_items(&self) -> &[String] {
        &self.consequent_items
    }

    pub fn is_consequent_item(&self, item: &str) -> bool {
        self.consequent_set.contains(item)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn transactions(&self) -> &[Vec<String>] {
        &self.transactions
    }

    /// Cover containing every transaction.
    pub fn full_cover(&self) -> &Cover {
        &self.full_cover
    }

    /// Draws a rule from a random transaction by rejection sampling.
    ///
    /// Each antecedent-eligible item of the transaction joins X with
    /// probability 1/2, consequent-eligible items become Y (the last one in
    /// shuffled order wins). A draw is kept only when the rule is valid and
    /// none of its frequencies covers the whole dataset. Returns `Ok(None)`
    /// once `max_attempts` draws have been rejected.
    pub fn random_valid_rule<R: Rng + ?Sized>(
        self: &Arc<Self>,
        rng: &mut R,
        max_attempts: usize,
        settings: &RuleSettings,
    ) -> Result<Option<RuleState>> {
        let n = self.transaction_count();

        for _ in 0..max_attempts {
            let tid = rng.gen_range(0..n);
            let mut items = self.transactions[tid].clone();
            items.shuffle(rng);

            let mut rule = RuleState::empty(Arc::clone(self), settings.clone())?;
            for item in items {
                if self.is_consequent_item(&item) {
                    rule.set_y(Some(item))?;
                } else if rng.gen_bool(0.5) {
                    rule.add_to_x(&item)?;
                }
            }

            if rule.is_valid() && rule.freq_x() < n && rule.freq_y() < n && rule.freq_z() < n {
                return Ok(Some(rule));
            }
        }

        debug!(max_attempts, "seed generation exhausted its attempt budget");
        Ok(None)
    }

    /// Up to `count` random valid rules; fewer when draws keep failing.
    pub fn random_valid_rules<R: Rng + ?Sized>(
        self: &Arc<Self>,
        rng: &mut R,
        count: usize,
        max_attempts: usize,
        settings: &RuleSettings,
    ) -> Result<Vec<RuleState>> {
        let mut rules = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            match self.random_valid_rule(rng, max_attempts, settings)? {
                Some(rule) => rules.push(rule),
                None => break,
            }
        }
        Ok(rules)
    }

    /// Groups items that are connected through shared transactions.
    pub fn equivalence_classes(&self) -> Vec<Vec<String>> {
        let mut names: Vec<&String> = self.item_covers.keys().collect();
        names.sort_unstable();
        let index: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut parents: Vec<usize> = (0..names.len()).collect();
        for transaction in &self.transactions {
            let Some(first) = transaction.first() else {
                continue;
            };
            let root = index[first.as_str()];
            for item in &transaction[1..] {
                union(&mut parents, root, index[item.as_str()]);
            }
        }

        let mut classes: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (idx, name) in names.iter().enumerate() {
            let root = find(&mut parents, idx);
            classes.entry(root).or_default().push((*name).clone());
        }
        classes.into_values().collect()
    }
}

fn find(parents: &mut [usize], mut node: usize) -> usize {
    while parents[node] != node {
        parents[node] = parents[parents[node]];
        node = parents[node];
    }
    node
}

fn union(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find(parents, a);
    let root_b = find(parents, b);
    if root_a != root_b {
        parents[root_b.max(root_a)] = root_a.min(root_b);
    }
}
