// Doctriage Core Services

pub mod categories;
pub mod config_store;
pub mod document_io;
pub mod keyword_bank;
pub mod triage;
pub mod vision_client;

pub use categories::*;
pub use config_store::*;
pub use document_io::*;
pub use keyword_bank::*;
pub use vision_client::*;

// Re-export triage module functions
pub use triage::{
    analyze,
    auto_threshold,
    bucket_results,
    build_manifest,
    classify,
    classify_chunked,
    export_document,
    extract,
    merge,
    normalize_text,
    render_manifest,
    CancelToken,
    DrawingBuckets,
    ExportError,
    PartitionItem,
    TriagePartition,
    TriageSession,
};
