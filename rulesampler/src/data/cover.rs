use bit_set::BitSet;

/// Set of transaction indices containing an item or an item set.
///
/// Covers handed out by the dataset are shared; callers clone before
/// mutating (`and` works in place).
#[derive(Debug, Clone, Default)]
pub struct Cover {
    bits: BitSet,
}

impl Cover {
    pub fn new() -> Self {
        Self { bits: BitSet::new() }
    }

    /// Identity element of the AND reduction over `len` transactions.
    pub fn all_ones(len: usize) -> Self {
        let mut bits = BitSet::with_capacity(len);
        for tid in 0..len {
            bits.insert(tid);
        }
        Self { bits }
    }

    pub fn set(&mut self, tid: usize) {
        self.bits.insert(tid);
    }

    pub fn contains(&self, tid: usize) -> bool {
        self.bits.contains(tid)
    }

    /// In-place intersection with `other`.
    pub fn and(&mut self, other: &Cover) {
        self.bits.intersect_with(&other.bits);
    }

    pub fn cardinality(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter()
    }
}

impl PartialEq for Cover {
    fn eq(&self, other: &Self) -> bool {
        // Underlying bit vectors may differ in length after intersections.
        self.bits.iter().eq(other.bits.iter())
    }
}

impl Eq for Cover {}

impl FromIterator<usize> for Cover {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut cover = Cover::new();
        for tid in iter {
            cover.set(tid);
        }
        cover
    }
}
