// Triage Module
// Document triage core logic organized into specialized submodules:
// - classifier: page classification, keyword scoring, auto threshold
// - partition: keep/discard partition with override-aware reclassification
// - session: reducer-style interactive state (threshold, moves, selection)
// - orchestrator: wave/batch remote analysis with confidence bucketing
// - metadata: leading-page client/venue/title extraction
// - export: keep-set merge, manifest, document copy

pub mod classifier;
pub mod export;
pub mod metadata;
pub mod orchestrator;
pub mod partition;
pub mod session;

// Re-export commonly used functions
pub use classifier::{auto_threshold, classify, classify_chunked, normalize_text};
pub use export::{build_manifest, export_document, merge, render_manifest, ExportError};
pub use metadata::{extract, DEFAULT_META_PAGES};
pub use orchestrator::{
    analyze,
    bucket_results,
    CancelToken,
    DrawingBuckets,
    BATCH_SIZE,
    KEEP_CONFIDENCE,
    MAX_CONCURRENT_BATCHES,
    REVIEW_CONFIDENCE,
};
pub use partition::{PartitionItem, TriagePartition};
pub use session::TriageSession;
