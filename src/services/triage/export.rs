// Export Merger
// Combines the text-pipeline and drawing-pipeline keep sets into one ordered
// page-index list, builds the human-readable manifest, and drives the
// external document-copy primitive. Original page order is the only ordering
// guarantee the final artifact carries; nothing is re-ranked by score here.

use crate::models::{AnalysisResult, ManifestRow, PageType, ScoredPage};
use crate::services::document_io::{DocumentCopier, DocumentError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no pages selected for export")]
    EmptySelection,
    #[error("document copy failed: {0}")]
    Copy(#[from] DocumentError),
}

/// Union the two keep sets, deduplicate, and sort ascending by original
/// page index.
pub fn merge(text_keep: &[usize], drawing_keep: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = text_keep.iter().chain(drawing_keep).copied().collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn text_detail(page: &ScoredPage) -> String {
    if page.keyword_hits == 0 {
        return "no keyword hits".to_string();
    }
    let categories = if page.matched_categories.is_empty() {
        String::new()
    } else {
        format!(" [{}]", page.matched_categories.join(", "))
    };
    format!(
        "score {:.3}, {} keyword hits{}",
        page.score, page.keyword_hits, categories
    )
}

fn drawing_detail(result: &AnalysisResult) -> String {
    let description = result.description.trim();
    if description.is_empty() {
        format!("{} ({}%)", result.category_label, result.confidence)
    } else {
        format!(
            "{} ({}%): {}",
            result.category_label, result.confidence, description
        )
    }
}

/// Merge both pipelines' keep sets into manifest rows sorted by original
/// page index.
pub fn build_manifest(
    text_keep: &[ScoredPage],
    drawing_keep: &[AnalysisResult],
) -> Vec<ManifestRow> {
    let mut rows: Vec<(usize, ManifestRow)> = Vec::with_capacity(text_keep.len() + drawing_keep.len());
    for page in text_keep {
        rows.push((
            page.page_index(),
            ManifestRow {
                page_number: page.page_number(),
                page_type: PageType::Text,
                detail: text_detail(page),
            },
        ));
    }
    for result in drawing_keep {
        rows.push((
            result.page_index,
            ManifestRow {
                page_number: result.page_number,
                page_type: PageType::Drawing,
                detail: drawing_detail(result),
            },
        ));
    }
    rows.sort_by_key(|(idx, _)| *idx);
    rows.dedup_by_key(|(idx, _)| *idx);
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Render manifest rows as an aligned plain-text table.
pub fn render_manifest(rows: &[ManifestRow]) -> String {
    let mut out = String::from("Page   Type     Detail\n");
    for row in rows {
        out.push_str(&format!(
            "{:<6} {:<8} {}\n",
            row.page_number,
            row.page_type.as_str(),
            row.detail
        ));
    }
    out
}

/// Produce the filtered document via the external copy primitive. An empty
/// selection is blocked here with a clear error rather than producing an
/// empty document.
pub fn export_document(
    copier: &dyn DocumentCopier,
    source: &[u8],
    indices: &[usize],
) -> Result<Vec<u8>, ExportError> {
    if indices.is_empty() {
        return Err(ExportError::EmptySelection);
    }
    let bytes = copier.copy_pages(source, indices)?;
    info!("[EXPORT] produced document with {} pages", indices.len());
    Ok(bytes)
}
