// Doctriage Data Models
// Wire-facing structs shared by the triage engine and its adapters

use serde::{Deserialize, Serialize};

// ============ Pages ============

/// Coarse page class decided by extracted-text volume.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Text,
    Drawing,
}

impl PageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Text => "Text",
            PageType::Drawing => "Drawing",
        }
    }
}

/// One page of the source document. `page_index` is the stable 0-based
/// identity; `page_number` is the 1-based display number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_index: usize,
    pub page_number: usize,
    pub page_type: PageType,
    pub text_length: usize,
    pub text_snippet: String,
    pub has_text: bool,
}

/// Export recommendation tier derived from classification and score.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Keep,
    Maybe,
    Review,
    Discard,
}

/// A page with its keyword-relevance score attached. Created once per
/// classification run and never mutated; re-scoring means re-classifying.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPage {
    #[serde(flatten)]
    pub page: Page,
    pub score: f64,
    pub keyword_hits: u32,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub matched_categories: Vec<String>,
    pub recommendation: Recommendation,
}

impl ScoredPage {
    pub fn page_index(&self) -> usize {
        self.page.page_index
    }

    pub fn page_number(&self) -> usize {
        self.page.page_number
    }
}

/// Output of one classification run over a whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedDocument {
    pub text_pages: Vec<ScoredPage>,
    pub drawing_pages: Vec<ScoredPage>,
    pub total_pages: usize,
    pub total_chars: usize,
    pub is_likely_scanned: bool,
    #[serde(default)]
    pub processing_time_ms: u64,
}

// ============ Remote Analysis ============

/// One page image handed to the remote analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImage {
    pub page_index: usize,
    pub page_number: usize,
    /// Raw image bytes; the wire client base64-encodes on send.
    #[serde(default, skip_serializing)]
    pub image_data: Vec<u8>,
}

/// Per-page outcome of a remote analysis run. A failed batch still yields
/// one placeholder instance per input image (category "other", confidence 0),
/// so every input page maps to exactly one result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub page_index: usize,
    pub page_number: usize,
    pub category: String,
    pub category_label: String,
    #[serde(default)]
    pub description: String,
    pub confidence: u8,
}

pub const FALLBACK_CATEGORY: &str = "other";

impl AnalysisResult {
    /// Zero-confidence placeholder for a page whose batch failed.
    pub fn placeholder(page_index: usize, page_number: usize, detail: &str) -> Self {
        Self {
            page_index,
            page_number,
            category: FALLBACK_CATEGORY.to_string(),
            category_label: "Error".to_string(),
            description: format!("analysis unavailable: {}", detail),
            confidence: 0,
        }
    }
}

/// Cumulative progress snapshot reported once per completed wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub completed: usize,
    pub total: usize,
    pub results: Vec<AnalysisResult>,
}

// ============ Metadata ============

/// Best-effort header metadata guessed from leading pages. Fields are left
/// empty rather than fabricated; the whole value is recomputed on demand and
/// never merged with a previous guess.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMeta {
    pub client_name: Option<String>,
    pub venue: Option<String>,
    pub project_title: Option<String>,
    pub confidence: f64,
}

// ============ Export ============

/// One line of the human-readable export manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRow {
    pub page_number: usize,
    pub page_type: PageType,
    pub detail: String,
}
