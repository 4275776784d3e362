// Threshold Partitioner
// Keep/discard partition over ranked items. The same structure serves both
// pipelines: text pages ranked by relevance score and drawing pages ranked
// by analysis confidence. Every mutation preserves the completeness
// invariant: keep and discard together hold each item exactly once.

use crate::models::{AnalysisResult, ScoredPage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// An item that can live in a keep/discard partition.
pub trait PartitionItem {
    /// Stable identity (the original page index).
    fn item_id(&self) -> usize;
    /// Rank used for threshold decisions and ordering.
    fn rank(&self) -> f64;
}

impl PartitionItem for ScoredPage {
    fn item_id(&self) -> usize {
        self.page.page_index
    }

    fn rank(&self) -> f64 {
        self.score
    }
}

impl PartitionItem for AnalysisResult {
    fn item_id(&self) -> usize {
        self.page_index
    }

    fn rank(&self) -> f64 {
        f64::from(self.confidence)
    }
}

/// Ordered keep/discard split. Keep is sorted by rank descending; discard
/// ascending, so the highest-ranked discards sit next to the boundary where
/// they are easiest to rescue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriagePartition<T> {
    pub keep: Vec<T>,
    pub discard: Vec<T>,
}

impl<T> Default for TriagePartition<T> {
    fn default() -> Self {
        Self {
            keep: Vec::new(),
            discard: Vec::new(),
        }
    }
}

fn by_rank_desc<T: PartitionItem>(a: &T, b: &T) -> Ordering {
    b.rank()
        .partial_cmp(&a.rank())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item_id().cmp(&b.item_id()))
}

fn by_rank_asc<T: PartitionItem>(a: &T, b: &T) -> Ordering {
    a.rank()
        .partial_cmp(&b.rank())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item_id().cmp(&b.item_id()))
}

impl<T: PartitionItem> TriagePartition<T> {
    /// Assemble a partition from pre-bucketed lists, applying the canonical
    /// orderings.
    pub fn from_lists(keep: Vec<T>, discard: Vec<T>) -> Self {
        let mut partition = Self { keep, discard };
        partition.resort();
        partition
    }

    /// Initial split: rank at or above the threshold keeps.
    pub fn split(items: Vec<T>, threshold: f64) -> Self {
        let mut partition = Self {
            keep: Vec::new(),
            discard: Vec::new(),
        };
        for item in items {
            if item.rank() >= threshold {
                partition.keep.push(item);
            } else {
                partition.discard.push(item);
            }
        }
        partition.resort();
        partition
    }

    /// Re-apply a threshold while honoring explicit manual overrides:
    /// overridden ids stay where the user put them; every other item follows
    /// the plain rank-vs-threshold rule. After this call, any keep-resident
    /// item ranked below the threshold is exactly a manual keep (and
    /// symmetrically for discard).
    pub fn reclassify(
        self,
        threshold: f64,
        manual_keep: &HashSet<usize>,
        manual_discard: &HashSet<usize>,
    ) -> Self {
        let mut all: Vec<T> = self.keep.into_iter().chain(self.discard).collect();
        let mut partition = Self {
            keep: Vec::new(),
            discard: Vec::new(),
        };
        for item in all.drain(..) {
            let id = item.item_id();
            let keeps = if manual_keep.contains(&id) {
                true
            } else if manual_discard.contains(&id) {
                false
            } else {
                item.rank() >= threshold
            };
            if keeps {
                partition.keep.push(item);
            } else {
                partition.discard.push(item);
            }
        }
        partition.resort();
        partition
    }

    /// Move the given ids into keep. Set-safe: ids already in keep are left
    /// alone, membership never duplicates.
    pub fn move_to_keep(&mut self, ids: &HashSet<usize>) {
        let moved: Vec<T> = {
            let mut taken = Vec::new();
            let mut remaining = Vec::new();
            for item in self.discard.drain(..) {
                if ids.contains(&item.item_id()) {
                    taken.push(item);
                } else {
                    remaining.push(item);
                }
            }
            self.discard = remaining;
            taken
        };
        self.keep.extend(moved);
        self.keep.sort_by(by_rank_desc);
    }

    /// Move the given ids into discard. Mirror of `move_to_keep`.
    pub fn move_to_discard(&mut self, ids: &HashSet<usize>) {
        let moved: Vec<T> = {
            let mut taken = Vec::new();
            let mut remaining = Vec::new();
            for item in self.keep.drain(..) {
                if ids.contains(&item.item_id()) {
                    taken.push(item);
                } else {
                    remaining.push(item);
                }
            }
            self.keep = remaining;
            taken
        };
        self.discard.extend(moved);
        self.discard.sort_by(by_rank_asc);
    }

    pub fn len(&self) -> usize {
        self.keep.len() + self.discard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.discard.is_empty()
    }

    pub fn keep_ids(&self) -> Vec<usize> {
        self.keep.iter().map(|i| i.item_id()).collect()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.keep.iter().any(|i| i.item_id() == id)
            || self.discard.iter().any(|i| i.item_id() == id)
    }

    pub fn is_kept(&self, id: usize) -> bool {
        self.keep.iter().any(|i| i.item_id() == id)
    }

    fn resort(&mut self) {
        self.keep.sort_by(by_rank_desc);
        self.discard.sort_by(by_rank_asc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, PageType, Recommendation};

    fn page(id: usize, score: f64) -> ScoredPage {
        ScoredPage {
            page: Page {
                page_index: id,
                page_number: id + 1,
                page_type: PageType::Text,
                text_length: 100,
                text_snippet: String::new(),
                has_text: true,
            },
            score,
            keyword_hits: 0,
            matched_keywords: vec![],
            matched_categories: vec![],
            recommendation: Recommendation::Maybe,
        }
    }

    fn ids(items: &[ScoredPage]) -> Vec<usize> {
        items.iter().map(|p| p.item_id()).collect()
    }

    fn assert_complete(p: &TriagePartition<ScoredPage>, universe: &[usize]) {
        let mut seen: Vec<usize> = p
            .keep
            .iter()
            .chain(p.discard.iter())
            .map(|i| i.item_id())
            .collect();
        seen.sort_unstable();
        let mut expected = universe.to_vec();
        expected.sort_unstable();
        assert_eq!(seen, expected, "partition lost or duplicated items");
    }

    #[test]
    fn test_split_orders_both_sides() {
        let pages = vec![page(0, 0.9), page(1, 0.1), page(2, 0.5), page(3, 0.05)];
        let p = TriagePartition::split(pages, 0.5);
        assert_eq!(ids(&p.keep), vec![0, 2]);
        assert_eq!(ids(&p.discard), vec![3, 1]);
        assert_complete(&p, &[0, 1, 2, 3]);
    }

    #[test]
    fn test_reclassify_completeness_across_thresholds() {
        let pages: Vec<ScoredPage> = (0..20).map(|i| page(i, i as f64 / 20.0)).collect();
        let universe: Vec<usize> = (0..20).collect();
        let mut p = TriagePartition::split(pages, 0.3);
        assert_complete(&p, &universe);
        for t in [0.0, 0.25, 0.6, 0.95, 0.1] {
            p = p.reclassify(t, &HashSet::new(), &HashSet::new());
            assert_complete(&p, &universe);
            for item in &p.keep {
                assert!(item.rank() >= t);
            }
            for item in &p.discard {
                assert!(item.rank() < t);
            }
        }
    }

    #[test]
    fn test_manual_keep_survives_threshold_raise() {
        let pages = vec![page(0, 0.05), page(1, 0.5), page(2, 0.25)];
        let mut p = TriagePartition::split(pages, 0.2);
        assert!(!p.is_kept(0));

        p.move_to_keep(&HashSet::from([0]));
        let manual_keep = HashSet::from([0]);
        let p = p.reclassify(0.20, &manual_keep, &HashSet::new());
        assert!(p.is_kept(0), "manual keep must survive the raised threshold");
        assert!(p.is_kept(1));
        assert!(p.is_kept(2));
    }

    #[test]
    fn test_manual_discard_not_pulled_back() {
        let pages = vec![page(0, 0.8), page(1, 0.5)];
        let mut p = TriagePartition::split(pages, 0.3);
        p.move_to_discard(&HashSet::from([0]));
        let manual_discard = HashSet::from([0]);
        let p = p.reclassify(0.1, &HashSet::new(), &manual_discard);
        assert!(!p.is_kept(0), "manual discard must not be rescued by a lower threshold");
        assert!(p.is_kept(1));
    }

    #[test]
    fn test_moves_are_set_safe() {
        let pages = vec![page(0, 0.9), page(1, 0.2), page(2, 0.4)];
        let mut p = TriagePartition::split(pages, 0.5);
        // id 0 is already kept; id 1 comes over from discard.
        p.move_to_keep(&HashSet::from([0, 1]));
        assert_eq!(p.len(), 3);
        assert_eq!(ids(&p.keep), vec![0, 1]);
        assert_eq!(ids(&p.discard), vec![2]);

        p.move_to_discard(&HashSet::from([1]));
        assert_eq!(p.len(), 3);
        assert_eq!(ids(&p.discard), vec![1, 2]);
        assert!(!p.is_kept(1));
    }
}
