// Triage Session
// Reducer-style interactive state for one loaded document: the text and
// drawing partitions, the active threshold, manual-override bookkeeping, and
// click/shift-click selection. All mutation funnels through the action
// methods here; the partitions themselves stay dumb ordered lists, which
// keeps the partition invariants unit-testable in isolation.

use crate::models::{AnalysisResult, ClassifiedDocument, ManifestRow, ScoredPage};
use crate::services::triage::classifier::auto_threshold;
use crate::services::triage::export::{build_manifest, merge};
use crate::services::triage::orchestrator::{bucket_results, REVIEW_CONFIDENCE};
use crate::services::triage::partition::{PartitionItem, TriagePartition};
use std::collections::{BTreeSet, HashSet};

pub struct TriageSession {
    threshold: f64,
    text: TriagePartition<ScoredPage>,
    drawings: TriagePartition<AnalysisResult>,
    analysis_results: Vec<AnalysisResult>,
    review_ids: BTreeSet<usize>,
    enabled_categories: HashSet<String>,
    manual_text_keep: HashSet<usize>,
    manual_text_discard: HashSet<usize>,
    manual_drawing_keep: HashSet<usize>,
    manual_drawing_discard: HashSet<usize>,
    /// Review-zone pages the user has already adjudicated; the flag must not
    /// come back when later waves re-bucket.
    settled_review: HashSet<usize>,
    selection: BTreeSet<usize>,
    anchor: Option<usize>,
}

impl TriageSession {
    /// Open a session over a classification run. With no explicit threshold
    /// the automatic one is derived from the score distribution.
    pub fn new(
        doc: &ClassifiedDocument,
        threshold: Option<f64>,
        enabled_categories: HashSet<String>,
    ) -> Self {
        let threshold = threshold.unwrap_or_else(|| auto_threshold(&doc.text_pages));
        Self {
            threshold,
            text: TriagePartition::split(doc.text_pages.clone(), threshold),
            drawings: TriagePartition::default(),
            analysis_results: Vec::new(),
            review_ids: BTreeSet::new(),
            enabled_categories,
            manual_text_keep: HashSet::new(),
            manual_text_discard: HashSet::new(),
            manual_drawing_keep: HashSet::new(),
            manual_drawing_discard: HashSet::new(),
            settled_review: HashSet::new(),
            selection: BTreeSet::new(),
            anchor: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn text(&self) -> &TriagePartition<ScoredPage> {
        &self.text
    }

    pub fn drawings(&self) -> &TriagePartition<AnalysisResult> {
        &self.drawings
    }

    pub fn review_ids(&self) -> &BTreeSet<usize> {
        &self.review_ids
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    // ============ Threshold & overrides ============

    /// Re-partition text pages under a new threshold. Manual overrides stay
    /// where the user put them.
    pub fn set_threshold(&mut self, threshold: f64) {
        let text = std::mem::take(&mut self.text);
        self.text = text.reclassify(threshold, &self.manual_text_keep, &self.manual_text_discard);
        self.threshold = threshold;
    }

    fn text_score(&self, id: usize) -> Option<f64> {
        self.text
            .keep
            .iter()
            .chain(self.text.discard.iter())
            .find(|p| p.item_id() == id)
            .map(|p| p.score)
    }

    /// Move text pages into keep. A move against the threshold rule records
    /// a manual override; a move that agrees with it clears any override.
    pub fn move_text_to_keep(&mut self, ids: &HashSet<usize>) {
        for &id in ids {
            match self.text_score(id) {
                Some(score) if score < self.threshold => {
                    self.manual_text_keep.insert(id);
                    self.manual_text_discard.remove(&id);
                }
                Some(_) => {
                    self.manual_text_keep.remove(&id);
                    self.manual_text_discard.remove(&id);
                }
                None => {}
            }
        }
        self.text.move_to_keep(ids);
    }

    pub fn move_text_to_discard(&mut self, ids: &HashSet<usize>) {
        for &id in ids {
            match self.text_score(id) {
                Some(score) if score >= self.threshold => {
                    self.manual_text_discard.insert(id);
                    self.manual_text_keep.remove(&id);
                }
                Some(_) => {
                    self.manual_text_keep.remove(&id);
                    self.manual_text_discard.remove(&id);
                }
                None => {}
            }
        }
        self.text.move_to_discard(ids);
    }

    // ============ Drawing pipeline ============

    fn drawing_rule_keeps(&self, result: &AnalysisResult) -> bool {
        self.enabled_categories.contains(&result.category)
            && result.confidence >= REVIEW_CONFIDENCE
    }

    fn drawing_by_id(&self, id: usize) -> Option<AnalysisResult> {
        self.drawings
            .keep
            .iter()
            .chain(self.drawings.discard.iter())
            .find(|r| r.page_index == id)
            .cloned()
    }

    pub fn move_drawings_to_keep(&mut self, ids: &HashSet<usize>) {
        for &id in ids {
            if let Some(result) = self.drawing_by_id(id) {
                if self.drawing_rule_keeps(&result) {
                    self.manual_drawing_keep.remove(&id);
                    self.manual_drawing_discard.remove(&id);
                } else {
                    self.manual_drawing_keep.insert(id);
                    self.manual_drawing_discard.remove(&id);
                }
                // The user has adjudicated; the review flag is settled.
                self.settled_review.insert(id);
                self.review_ids.remove(&id);
            }
        }
        self.drawings.move_to_keep(ids);
    }

    pub fn move_drawings_to_discard(&mut self, ids: &HashSet<usize>) {
        for &id in ids {
            if let Some(result) = self.drawing_by_id(id) {
                if self.drawing_rule_keeps(&result) {
                    self.manual_drawing_discard.insert(id);
                    self.manual_drawing_keep.remove(&id);
                } else {
                    self.manual_drawing_discard.remove(&id);
                    self.manual_drawing_keep.remove(&id);
                }
                self.settled_review.insert(id);
                self.review_ids.remove(&id);
            }
        }
        self.drawings.move_to_discard(ids);
    }

    /// Rebuild the drawing partition from a cumulative result list (called
    /// after each analysis wave), re-applying any manual overrides.
    pub fn apply_analysis(&mut self, results: &[AnalysisResult]) {
        self.analysis_results = results.to_vec();
        self.rebucket();
    }

    /// Toggle the enabled analysis categories and re-bucket accordingly.
    pub fn set_enabled_categories(&mut self, enabled_categories: HashSet<String>) {
        self.enabled_categories = enabled_categories;
        self.rebucket();
    }

    fn rebucket(&mut self) {
        let buckets = bucket_results(&self.analysis_results, &self.enabled_categories);
        let mut partition = buckets.partition;
        partition.move_to_keep(&self.manual_drawing_keep);
        partition.move_to_discard(&self.manual_drawing_discard);
        self.review_ids = buckets.review_ids;
        for id in self
            .manual_drawing_keep
            .iter()
            .chain(self.manual_drawing_discard.iter())
            .chain(self.settled_review.iter())
        {
            self.review_ids.remove(id);
        }
        self.drawings = partition;
    }

    // ============ Selection ============

    /// Plain click: toggle membership and set the range anchor.
    pub fn click(&mut self, id: usize) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        self.anchor = Some(id);
    }

    /// Shift-click: select the contiguous range between the anchor and this
    /// id in the given display order. Falls back to a plain click when there
    /// is no usable anchor.
    pub fn shift_click(&mut self, id: usize, display_order: &[usize]) {
        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => return self.click(id),
        };
        let a = display_order.iter().position(|x| *x == anchor);
        let b = display_order.iter().position(|x| *x == id);
        match (a, b) {
            (Some(a), Some(b)) => {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                for idx in &display_order[lo..=hi] {
                    self.selection.insert(*idx);
                }
            }
            _ => self.click(id),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.anchor = None;
    }

    /// Apply the current selection as a move into keep, then clear it.
    pub fn move_selected_to_keep(&mut self) {
        let (text_ids, drawing_ids) = self.split_selection();
        if !text_ids.is_empty() {
            self.move_text_to_keep(&text_ids);
        }
        if !drawing_ids.is_empty() {
            self.move_drawings_to_keep(&drawing_ids);
        }
        self.selection.clear();
    }

    pub fn move_selected_to_discard(&mut self) {
        let (text_ids, drawing_ids) = self.split_selection();
        if !text_ids.is_empty() {
            self.move_text_to_discard(&text_ids);
        }
        if !drawing_ids.is_empty() {
            self.move_drawings_to_discard(&drawing_ids);
        }
        self.selection.clear();
    }

    fn split_selection(&self) -> (HashSet<usize>, HashSet<usize>) {
        let text_ids = self
            .selection
            .iter()
            .copied()
            .filter(|id| self.text.contains(*id))
            .collect();
        let drawing_ids = self
            .selection
            .iter()
            .copied()
            .filter(|id| self.drawings.contains(*id))
            .collect();
        (text_ids, drawing_ids)
    }

    // ============ Export ============

    pub fn export_indices(&self) -> Vec<usize> {
        merge(&self.text.keep_ids(), &self.drawings.keep_ids())
    }

    pub fn manifest(&self) -> Vec<ManifestRow> {
        build_manifest(&self.text.keep, &self.drawings.keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, PageType, Recommendation};

    fn scored(idx: usize, score: f64) -> ScoredPage {
        ScoredPage {
            page: Page {
                page_index: idx,
                page_number: idx + 1,
                page_type: PageType::Text,
                text_length: 100,
                text_snippet: String::new(),
                has_text: true,
            },
            score,
            keyword_hits: 1,
            matched_keywords: vec![],
            matched_categories: vec![],
            recommendation: Recommendation::Maybe,
        }
    }

    fn doc(scores: &[f64]) -> ClassifiedDocument {
        ClassifiedDocument {
            text_pages: scores
                .iter()
                .enumerate()
                .map(|(i, s)| scored(i, *s))
                .collect(),
            drawing_pages: vec![],
            total_pages: scores.len(),
            total_chars: scores.len() * 100,
            is_likely_scanned: false,
            processing_time_ms: 0,
        }
    }

    fn result(idx: usize, category: &str, confidence: u8) -> AnalysisResult {
        AnalysisResult {
            page_index: idx,
            page_number: idx + 1,
            category: category.to_string(),
            category_label: category.to_string(),
            description: String::new(),
            confidence,
        }
    }

    fn enabled(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_manual_keep_survives_threshold_raise() {
        let mut session = TriageSession::new(&doc(&[0.05, 0.5, 0.25]), Some(0.2), enabled(&[]));
        assert!(!session.text().is_kept(0));

        session.move_text_to_keep(&HashSet::from([0]));
        session.set_threshold(0.20);
        assert!(session.text().is_kept(0), "manual keep lost on threshold change");

        session.set_threshold(0.4);
        assert!(session.text().is_kept(0));
        assert!(session.text().is_kept(1));
        assert!(!session.text().is_kept(2), "unoverridden page must follow the rule");
    }

    #[test]
    fn test_manual_discard_not_rescued_by_lower_threshold() {
        let mut session = TriageSession::new(&doc(&[0.8, 0.5]), Some(0.3), enabled(&[]));
        session.move_text_to_discard(&HashSet::from([0]));
        session.set_threshold(0.1);
        assert!(!session.text().is_kept(0));
        assert!(session.text().is_kept(1));
    }

    #[test]
    fn test_countermanding_move_clears_override() {
        let mut session = TriageSession::new(&doc(&[0.25, 0.5]), Some(0.2), enabled(&[]));
        // Against the rule: records an override.
        session.move_text_to_discard(&HashSet::from([0]));
        // Back in agreement with the rule: override cleared.
        session.move_text_to_keep(&HashSet::from([0]));
        session.set_threshold(0.3);
        assert!(!session.text().is_kept(0), "cleared override must not pin the page");
    }

    #[test]
    fn test_partition_complete_through_session_actions() {
        let mut session = TriageSession::new(&doc(&[0.1, 0.2, 0.3, 0.4]), Some(0.25), enabled(&[]));
        session.move_text_to_keep(&HashSet::from([0]));
        session.set_threshold(0.35);
        session.move_text_to_discard(&HashSet::from([3]));
        session.set_threshold(0.05);
        assert_eq!(session.text().len(), 4);
    }

    #[test]
    fn test_selection_click_and_shift_click() {
        let mut session = TriageSession::new(&doc(&[0.1; 5]), Some(0.5), enabled(&[]));
        let display_order = [0, 1, 2, 3, 4];

        session.click(1);
        session.shift_click(3, &display_order);
        assert_eq!(session.selected().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        // Click toggles membership off.
        session.click(2);
        assert!(!session.selected().contains(&2));

        // Reverse-direction range from the new anchor.
        session.shift_click(0, &display_order);
        assert!(session.selected().contains(&0));
        assert!(session.selected().contains(&1));
    }

    #[test]
    fn test_move_selected_records_overrides() {
        let mut session = TriageSession::new(&doc(&[0.05, 0.9]), Some(0.5), enabled(&[]));
        session.click(0);
        session.move_selected_to_keep();
        assert!(session.text().is_kept(0));
        assert!(session.selected().is_empty());
        session.set_threshold(0.8);
        assert!(session.text().is_kept(0));
    }

    #[test]
    fn test_apply_analysis_preserves_drawing_overrides() {
        let mut session = TriageSession::new(&doc(&[]), Some(0.2), enabled(&["display"]));
        session.apply_analysis(&[result(5, "display", 95), result(6, "display", 10)]);
        assert!(session.drawings().is_kept(5));
        assert!(!session.drawings().is_kept(6));

        // User rescues the low-confidence page; the next cumulative wave
        // must not undo that.
        session.move_drawings_to_keep(&HashSet::from([6]));
        session.apply_analysis(&[
            result(5, "display", 95),
            result(6, "display", 10),
            result(7, "display", 80),
        ]);
        assert!(session.drawings().is_kept(6));
        assert!(session.drawings().is_kept(7));
        assert_eq!(session.drawings().len(), 3);
    }

    #[test]
    fn test_review_zone_tracked_and_settled_by_moves() {
        let mut session = TriageSession::new(&doc(&[]), Some(0.2), enabled(&["display"]));
        session.apply_analysis(&[result(3, "display", 50), result(4, "display", 90)]);
        assert!(session.review_ids().contains(&3));
        assert!(session.drawings().is_kept(3));

        session.move_drawings_to_keep(&HashSet::from([3]));
        assert!(!session.review_ids().contains(&3));
        session.apply_analysis(&[result(3, "display", 50), result(4, "display", 90)]);
        assert!(
            !session.review_ids().contains(&3),
            "adjudicated page must stay settled across waves"
        );
    }

    #[test]
    fn test_category_toggle_rebuckets() {
        let mut session = TriageSession::new(&doc(&[]), Some(0.2), enabled(&["display", "signage"]));
        session.apply_analysis(&[result(0, "signage", 95)]);
        assert!(session.drawings().is_kept(0));

        session.set_enabled_categories(enabled(&["display"]));
        assert!(!session.drawings().is_kept(0), "disabled category must discard");
    }

    #[test]
    fn test_export_indices_merge_both_pipelines() {
        let mut session = TriageSession::new(&doc(&[0.9, 0.1]), Some(0.5), enabled(&["display"]));
        session.apply_analysis(&[result(5, "display", 95), result(3, "display", 80)]);
        assert_eq!(session.export_indices(), vec![0, 3, 5]);
        let manifest = session.manifest();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0].page_number, 1);
    }
}
