// Remote-Analysis Orchestrator
// Drives batched calls to the remote vision service in waves: each wave
// submits a bounded number of batches concurrently and fully resolves before
// the next wave starts. Failures are isolated at batch granularity: a bad
// batch becomes zero-confidence placeholders, never an aborted run.
// Cancellation is cooperative, checked only at wave boundaries.

use crate::models::{AnalysisProgress, AnalysisResult, PageImage};
use crate::services::triage::partition::TriagePartition;
use crate::services::vision_client::AnalysisService;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Images per remote request.
pub const BATCH_SIZE: usize = 5;
/// Batches in flight at once within a wave.
pub const MAX_CONCURRENT_BATCHES: usize = 3;
const BATCH_TIMEOUT_SECS: u64 = 60;

/// Confidence at or above which an enabled-category result is kept outright.
pub const KEEP_CONFIDENCE: u8 = 70;
/// Confidence below which a result is discarded even for an enabled category.
pub const REVIEW_CONFIDENCE: u8 = 30;

/// Cooperative cancellation handle. Cancelling never aborts an in-flight
/// batch; it stops new waves from starting.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One result per input image, in input order: service results correlated by
/// page index, gaps and failures filled with placeholders.
fn correlate_batch(
    batch: &[PageImage],
    outcome: Result<Vec<AnalysisResult>, String>,
) -> Vec<AnalysisResult> {
    match outcome {
        Ok(results) => {
            let mut by_index: BTreeMap<usize, AnalysisResult> = results
                .into_iter()
                .map(|r| (r.page_index, r))
                .collect();
            batch
                .iter()
                .map(|img| {
                    by_index.remove(&img.page_index).unwrap_or_else(|| {
                        AnalysisResult::placeholder(
                            img.page_index,
                            img.page_number,
                            "no result returned for page",
                        )
                    })
                })
                .collect()
        }
        Err(detail) => batch
            .iter()
            .map(|img| AnalysisResult::placeholder(img.page_index, img.page_number, &detail))
            .collect(),
    }
}

/// Run the full analysis over `images`. Returns exactly one result per input
/// image unless cancelled first, in which case the partial accumulation from
/// completed waves is returned as-is.
pub async fn analyze(
    service: Arc<dyn AnalysisService>,
    images: Vec<PageImage>,
    enabled_categories: &[String],
    custom_instructions: &str,
    mut on_progress: impl FnMut(&AnalysisProgress),
    cancel: &CancelToken,
) -> Vec<AnalysisResult> {
    let run_id = Uuid::new_v4();
    let total = images.len();
    let batches: Vec<Vec<PageImage>> = images
        .chunks(BATCH_SIZE)
        .map(|c| c.to_vec())
        .collect();
    info!(
        "[ORCHESTRATOR] run={} images={} batches={} waves={}",
        run_id,
        total,
        batches.len(),
        batches.len().div_ceil(MAX_CONCURRENT_BATCHES)
    );

    let mut results: Vec<AnalysisResult> = Vec::with_capacity(total);

    for (wave_idx, wave) in batches.chunks(MAX_CONCURRENT_BATCHES).enumerate() {
        if cancel.is_cancelled() {
            info!(
                "[ORCHESTRATOR] run={} cancelled before wave {}; returning {} partial results",
                run_id,
                wave_idx,
                results.len()
            );
            return results;
        }

        let mut join_set: JoinSet<(usize, Vec<AnalysisResult>)> = JoinSet::new();
        for (batch_idx, batch) in wave.iter().enumerate() {
            let service = service.clone();
            let batch = batch.clone();
            let categories = enabled_categories.to_vec();
            let instructions = custom_instructions.to_string();
            join_set.spawn(async move {
                let timeout = std::time::Duration::from_secs(BATCH_TIMEOUT_SECS);
                let call = service.analyze_batch(&batch, &categories, &instructions);
                let outcome = match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(results)) => Ok(results),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("timeout after {}s", BATCH_TIMEOUT_SECS)),
                };
                (batch_idx, correlate_batch(&batch, outcome))
            });
        }

        // The wave is a barrier: every batch resolves (or is replaced by
        // placeholders) before any result is published.
        let mut wave_results: BTreeMap<usize, Vec<AnalysisResult>> = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((batch_idx, batch_results)) => {
                    wave_results.insert(batch_idx, batch_results);
                }
                Err(e) => warn!("[ORCHESTRATOR] run={} batch task failed: {}", run_id, e),
            }
        }
        // A panicked task leaves a hole; refill from the input so the
        // one-result-per-image contract survives even that.
        for (batch_idx, batch) in wave.iter().enumerate() {
            wave_results.entry(batch_idx).or_insert_with(|| {
                correlate_batch(batch, Err("analysis task aborted".to_string()))
            });
        }

        for (_, batch_results) in wave_results {
            results.extend(batch_results);
        }

        let failed = results.iter().filter(|r| r.confidence == 0).count();
        info!(
            "[ORCHESTRATOR] run={} wave {} done: {}/{} results ({} placeholder)",
            run_id,
            wave_idx,
            results.len(),
            total,
            failed
        );
        on_progress(&AnalysisProgress {
            completed: results.len(),
            total,
            results: results.clone(),
        });
    }

    results
}

/// Confidence bucketing of a completed (or in-progress) result set.
#[derive(Debug, Clone, Default)]
pub struct DrawingBuckets {
    pub partition: TriagePartition<AnalysisResult>,
    /// Page indices kept provisionally, awaiting human confirmation.
    pub review_ids: BTreeSet<usize>,
}

/// Bucket results by category enablement and confidence: enabled and >= 70
/// keeps; disabled (at any confidence) or < 30 discards; the band between
/// keeps with a review-zone flag.
pub fn bucket_results(
    results: &[AnalysisResult],
    enabled_categories: &HashSet<String>,
) -> DrawingBuckets {
    let mut keep = Vec::new();
    let mut discard = Vec::new();
    let mut review_ids = BTreeSet::new();

    for result in results {
        let enabled = enabled_categories.contains(&result.category);
        if enabled && result.confidence >= KEEP_CONFIDENCE {
            keep.push(result.clone());
        } else if !enabled || result.confidence < REVIEW_CONFIDENCE {
            discard.push(result.clone());
        } else {
            review_ids.insert(result.page_index);
            keep.push(result.clone());
        }
    }

    DrawingBuckets {
        partition: TriagePartition::from_lists(keep, discard),
        review_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::vision_client::AnalysisError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct MockService {
        fail_batch_containing: Option<usize>,
        reverse_results: bool,
        delay_ms: u64,
        confidence: u8,
        inflight: AtomicUsize,
        max_inflight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl MockService {
        fn new() -> Self {
            Self {
                fail_batch_containing: None,
                reverse_results: false,
                delay_ms: 5,
                confidence: 90,
                inflight: AtomicUsize::new(0),
                max_inflight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnalysisService for MockService {
        async fn analyze_batch(
            &self,
            images: &[PageImage],
            _enabled_categories: &[String],
            _custom_instructions: &str,
        ) -> Result<Vec<AnalysisResult>, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_inflight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            self.inflight.fetch_sub(1, Ordering::SeqCst);

            if let Some(poison) = self.fail_batch_containing {
                if images.iter().any(|i| i.page_index == poison) {
                    return Err(AnalysisError::Api {
                        status: 500,
                        message: "synthetic failure".to_string(),
                    });
                }
            }

            let mut results: Vec<AnalysisResult> = images
                .iter()
                .map(|img| AnalysisResult {
                    page_index: img.page_index,
                    page_number: img.page_number,
                    category: "display".to_string(),
                    category_label: "Display Drawing".to_string(),
                    description: format!("sheet {}", img.page_number),
                    confidence: self.confidence,
                })
                .collect();
            if self.reverse_results {
                results.reverse();
            }
            Ok(results)
        }
    }

    fn images(count: usize) -> Vec<PageImage> {
        (0..count)
            .map(|i| PageImage {
                page_index: i,
                page_number: i + 1,
                image_data: vec![0u8; 4],
            })
            .collect()
    }

    #[tokio::test]
    async fn test_completeness_under_batch_failure() {
        // 12 images, batch size 5 -> 3 batches in a single wave; the middle
        // batch (pages 5..10) fails.
        let mut service = MockService::new();
        service.fail_batch_containing = Some(5);
        let service = Arc::new(service);

        let mut progress_calls: Vec<(usize, usize)> = Vec::new();
        let results = analyze(
            service.clone(),
            images(12),
            &["display".to_string()],
            "",
            |p| progress_calls.push((p.completed, p.total)),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(results.len(), 12);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.page_index, i);
        }
        for result in &results[5..10] {
            assert_eq!(result.category, "other");
            assert_eq!(result.confidence, 0);
            assert!(result.description.contains("synthetic failure"));
        }
        assert_eq!(results[4].confidence, 90);
        assert_eq!(results[10].confidence, 90);
        assert_eq!(progress_calls, vec![(12, 12)]);
    }

    #[tokio::test]
    async fn test_wave_concurrency_and_progress_cadence() {
        // 20 images -> 4 batches -> 2 waves. At most 3 batches in flight,
        // and exactly one progress call per wave.
        let service = Arc::new(MockService::new());
        let mut progress_calls: Vec<usize> = Vec::new();
        let results = analyze(
            service.clone(),
            images(20),
            &["display".to_string()],
            "",
            |p| progress_calls.push(p.completed),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(results.len(), 20);
        assert_eq!(progress_calls, vec![15, 20]);
        assert_eq!(service.calls.load(Ordering::SeqCst), 4);
        assert!(service.max_inflight.load(Ordering::SeqCst) <= MAX_CONCURRENT_BATCHES);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_correlated() {
        let mut service = MockService::new();
        service.reverse_results = true;
        let results = analyze(
            Arc::new(service),
            images(7),
            &[],
            "",
            |_| {},
            &CancelToken::new(),
        )
        .await;
        let indices: Vec<usize> = results.iter().map(|r| r.page_index).collect();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_cancel_before_start_returns_empty() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut progress_count = 0usize;
        let results = analyze(
            Arc::new(MockService::new()),
            images(8),
            &[],
            "",
            |_| progress_count += 1,
            &cancel,
        )
        .await;
        assert!(results.is_empty());
        assert_eq!(progress_count, 0);
    }

    #[tokio::test]
    async fn test_cancel_between_waves_keeps_partial_results() {
        // Cancel from inside the first progress callback: the second wave
        // must never start and the first wave's results survive.
        let service = Arc::new(MockService::new());
        let cancel = CancelToken::new();
        let cancel_handle = cancel.clone();
        let results = analyze(
            service.clone(),
            images(20),
            &[],
            "",
            |_| cancel_handle.cancel(),
            &cancel,
        )
        .await;
        assert_eq!(results.len(), 15);
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    fn result(page_index: usize, category: &str, confidence: u8) -> AnalysisResult {
        AnalysisResult {
            page_index,
            page_number: page_index + 1,
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
    fn test_bucketing_thresholds() {
        let results = vec![
            result(0, "display", 95),
            result(1, "display", 70),
            result(2, "display", 55),
            result(3, "display", 30),
            result(4, "display", 29),
            result(5, "other", 0),
        ];
        let buckets = bucket_results(&results, &enabled(&["display"]));
        let kept: Vec<usize> = buckets.partition.keep_ids();
        assert_eq!(kept, vec![0, 1, 2, 3]);
        assert_eq!(buckets.review_ids, BTreeSet::from([2, 3]));
        let discarded: Vec<usize> = buckets
            .partition
            .discard
            .iter()
            .map(|r| r.page_index)
            .collect();
        assert_eq!(discarded, vec![5, 4]);
    }

    #[test]
    fn test_disabled_category_discards_even_at_high_confidence() {
        let results = vec![result(0, "signage", 95), result(1, "display", 95)];
        let buckets = bucket_results(&results, &enabled(&["display"]));
        assert_eq!(buckets.partition.keep_ids(), vec![1]);
        assert!(!buckets.partition.is_kept(0));
        assert!(buckets.review_ids.is_empty());
    }

    #[test]
    fn test_bucket_orderings() {
        let results = vec![
            result(0, "display", 71),
            result(1, "display", 99),
            result(2, "display", 10),
            result(3, "display", 25),
        ];
        let buckets = bucket_results(&results, &enabled(&["display"]));
        assert_eq!(buckets.partition.keep_ids(), vec![1, 0]);
        let discarded: Vec<u8> = buckets.partition.discard.iter().map(|r| r.confidence).collect();
        assert_eq!(discarded, vec![10, 25]);
    }
}
