use std::cmp::Ordering;

/// Upper bound on the slots reserved up front; larger collections grow on
/// demand.
const MAX_PREALLOCATED: usize = 1024;

/// Entry of a [`TopK`] collection.
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    /// Score recorded when the entry was inserted.
    pub score: f64,
    seq: u64,
    pub item: T,
}

/// Bounded collection ordered by descending score. Ties keep insertion
/// order, so an older entry outranks a newer one with the same score.
///
/// Scores are frozen at insertion time: a scorer whose output drifts
/// between calls never reorders entries already stored.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    capacity: usize,
    entries: Vec<Ranked<T>>,
    next_seq: u64,
}

impl<T> TopK<T> {
    pub fn new(capacity: usize) -> Self {
        let reserved = capacity.min(MAX_PREALLOCATED).saturating_add(1);
        Self { capacity, entries: Vec::with_capacity(reserved), next_seq: 0 }
    }

    /// Inserts `item` and returns the entry evicted to stay within capacity.
    pub fn insert(&mut self, item: T, score: f64) -> Option<Ranked<T>> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let pos = self
            .entries
            .partition_point(|entry| entry.score.total_cmp(&score) != Ordering::Less);
        self.entries.insert(pos, Ranked { score, seq, item });

        if self.entries.len() > self.capacity {
            self.entries.pop()
        } else {
            None
        }
    }

    pub fn contains_by(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.entries.iter().any(|entry| pred(&entry.item))
    }

    /// Entries from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &Ranked<T>> {
        self.entries.iter()
    }

    pub fn best(&self) -> Option<&Ranked<T>> {
        self.entries.first()
    }

    pub fn worst(&self) -> Option<&Ranked<T>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn into_vec(self) -> Vec<Ranked<T>> {
        self.entries
    }
}

impl<T> Ranked<T> {
    /// Insertion sequence number, unique within one collection.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
