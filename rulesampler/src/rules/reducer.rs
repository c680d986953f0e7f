use crate::data::{Cover, Dataset};
use rayon::prelude::*;

/// Intersects the covers of an item set by pairwise AND reduction.
///
/// Each round pairs up the current covers and ANDs every pair on the rayon
/// pool; an odd count is padded with the all-ones identity cover. An unknown
/// item contributes an empty cover, an empty item set yields all-ones.
pub struct CoverReducer<'a> {
    dataset: &'a Dataset,
}

impl<'a> CoverReducer<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn compute<'i, I>(&self, items: I) -> Cover
    where
        I: IntoIterator<Item = &'i String>,
    {
        let mut covers: Vec<Cover> = items
            .into_iter()
            .map(|item| self.dataset.item_cover(item).cloned().unwrap_or_default())
            .collect();

        while covers.len() > 1 {
            if covers.len() % 2 == 1 {
                covers.push(self.dataset.full_cover().clone());
            }
            covers = covers
                .par_chunks_mut(2)
                .map(|pair| {
                    let (left, right) = pair.split_at_mut(1);
                    let mut merged = std::mem::take(&mut left[0]);
                    merged.and(&right[0]);
                    merged
                })
                .collect();
        }

        match covers.pop() {
            Some(cover) => cover,
            None => self.dataset.full_cover().clone(),
        }
    }
}
