// Document I/O Collaborators
// Seams to the pieces the engine deliberately does not own: per-page text
// extraction, on-demand page rendering, and the page-subset copy primitive.
// PDF-backed adapters are provided for each; the engine itself only ever
// talks to the traits.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Hard cap on accepted document size.
pub const MAX_DOCUMENT_BYTES: usize = 500 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read document: {0}")]
    Extraction(String),
    #[error("document too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("page copy failed: {0}")]
    Copy(String),
    #[error("render failed for page {page_number}: {detail}")]
    Render { page_number: usize, detail: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-page plain-text extraction from raw document bytes. Extraction is all
/// or nothing: a document that cannot be read yields an error, never a
/// partial page list.
pub trait PageSource {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, DocumentError>;
}

/// On-demand page images for the remote analysis pipeline.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_thumbnail(
        &self,
        page_number: usize,
        width: u32,
    ) -> Result<Vec<u8>, DocumentError>;

    async fn render_full(
        &self,
        page_number: usize,
        max_width: u32,
    ) -> Result<Vec<u8>, DocumentError>;
}

/// Ordered page-subset copy: given source bytes and page indices, produce a
/// new document holding exactly those pages in exactly that order.
pub trait DocumentCopier {
    fn copy_pages(&self, source: &[u8], indices: &[usize]) -> Result<Vec<u8>, DocumentError>;
}

// ============ PDF adapters ============

/// `PageSource` backed by pdf-extract.
#[derive(Debug, Default)]
pub struct PdfPageSource;

impl PageSource for PdfPageSource {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(DocumentError::TooLarge {
                size: bytes.len(),
                max: MAX_DOCUMENT_BYTES,
            });
        }
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| DocumentError::Extraction(e.to_string()))?;
        info!("[DOCUMENT_IO] extracted {} pages", pages.len());
        Ok(pages)
    }
}

/// `PageRenderer` that serves pre-rendered `page_<n>.png` files from a
/// directory. Width hints are ignored; the files are whatever resolution
/// they were rendered at.
#[derive(Debug, Clone)]
pub struct DirRenderer {
    dir: PathBuf,
}

impl DirRenderer {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    async fn read_page(&self, page_number: usize) -> Result<Vec<u8>, DocumentError> {
        let path = self.dir.join(format!("page_{}.png", page_number));
        tokio::fs::read(&path).await.map_err(|e| DocumentError::Render {
            page_number,
            detail: format!("{}: {}", path.display(), e),
        })
    }
}

#[async_trait]
impl PageRenderer for DirRenderer {
    async fn render_thumbnail(
        &self,
        page_number: usize,
        _width: u32,
    ) -> Result<Vec<u8>, DocumentError> {
        self.read_page(page_number).await
    }

    async fn render_full(
        &self,
        page_number: usize,
        _max_width: u32,
    ) -> Result<Vec<u8>, DocumentError> {
        self.read_page(page_number).await
    }
}

/// `DocumentCopier` backed by lopdf. Keeps the requested pages by deleting
/// the complement, which preserves original order; the indices must
/// therefore arrive ascending, which is what the export merger produces.
#[derive(Debug, Default)]
pub struct LopdfCopier;

impl DocumentCopier for LopdfCopier {
    fn copy_pages(&self, source: &[u8], indices: &[usize]) -> Result<Vec<u8>, DocumentError> {
        if indices.is_empty() {
            return Err(DocumentError::Copy("no pages requested".to_string()));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DocumentError::Copy(
                "page indices must be strictly ascending".to_string(),
            ));
        }

        let mut doc = lopdf::Document::load_mem(source)
            .map_err(|e| DocumentError::Extraction(e.to_string()))?;
        let total = doc.get_pages().len();
        if let Some(out_of_range) = indices.iter().find(|i| **i >= total) {
            return Err(DocumentError::Copy(format!(
                "page index {} out of range (document has {} pages)",
                out_of_range, total
            )));
        }

        let wanted: HashSet<u32> = indices.iter().map(|i| *i as u32 + 1).collect();
        let to_delete: Vec<u32> = (1..=total as u32).filter(|n| !wanted.contains(n)).collect();
        if !to_delete.is_empty() {
            doc.delete_pages(&to_delete);
        }

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| DocumentError::Copy(e.to_string()))?;
        info!(
            "[DOCUMENT_IO] copied {} of {} pages",
            indices.len(),
            total
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, ObjectId};

    fn minimal_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..page_count {
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_copier_keeps_requested_pages() {
        let source = minimal_pdf(5);
        let copied = LopdfCopier.copy_pages(&source, &[0, 2, 4]).unwrap();
        let result = Document::load_mem(&copied).unwrap();
        assert_eq!(result.get_pages().len(), 3);
    }

    #[test]
    fn test_copier_rejects_unsorted_indices() {
        let source = minimal_pdf(3);
        let err = LopdfCopier.copy_pages(&source, &[2, 0]).unwrap_err();
        assert!(matches!(err, DocumentError::Copy(_)));
    }

    #[test]
    fn test_copier_rejects_out_of_range() {
        let source = minimal_pdf(3);
        let err = LopdfCopier.copy_pages(&source, &[0, 7]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_page_source_size_cap() {
        // Length check fires before any parsing, so a sparse huge buffer is
        // enough to exercise it without allocating real content.
        let bytes = vec![0u8; MAX_DOCUMENT_BYTES + 1];
        let err = PdfPageSource.page_texts(&bytes).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { .. }));
    }

    #[test]
    fn test_page_source_rejects_garbage() {
        let err = PdfPageSource.page_texts(b"not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_dir_renderer_reads_prerendered_pages() {
        let dir = std::env::temp_dir().join(format!("doctriage-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("page_3.png"), b"fake png bytes").unwrap();

        let renderer = DirRenderer::new(dir.clone());
        let bytes = renderer.render_full(3, 1600).await.unwrap();
        assert_eq!(bytes, b"fake png bytes");
        let err = renderer.render_thumbnail(9, 200).await.unwrap_err();
        assert!(matches!(err, DocumentError::Render { page_number: 9, .. }));

        std::fs::remove_dir_all(&dir).ok();
    }
}
