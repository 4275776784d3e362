use anyhow::{bail, Context};
use doctriage::services::config_store::{ConfigStore, TriageConfig};
use doctriage::services::document_io::{
    DirRenderer, LopdfCopier, PageRenderer, PageSource, PdfPageSource,
};
use doctriage::services::triage::classifier::{auto_threshold, classify_chunked};
use doctriage::services::triage::export::{export_document, render_manifest};
use doctriage::services::triage::metadata::{extract, DEFAULT_META_PAGES};
use doctriage::services::triage::orchestrator::{analyze, CancelToken};
use doctriage::services::triage::session::TriageSession;
use doctriage::services::vision_client::VisionClient;
use doctriage::models::PageImage;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    doctriage::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  triage_pdf <path.pdf> [--threshold <t>] [--keywords <a,b,c>] [--top <n>] [--meta] \\\n             [--analyze --images-dir <dir>] [--export <out.pdf>] [--manifest <path>]\n\nNotes:\n  - Without --threshold the cutoff is derived from the score distribution.\n  - --analyze needs pre-rendered page images (page_<n>.png) in --images-dir\n    and DOCTRIAGE_VISION_URL / DOCTRIAGE_VISION_API_KEY in the environment.\n  - --export writes the kept pages, in original order, to a new PDF."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let threshold_arg: Option<f64> = parse_arg_value(&args, "--threshold").and_then(|s| s.parse().ok());
    let keywords_arg = parse_arg_value(&args, "--keywords");
    let top_n: usize = parse_arg_value(&args, "--top")
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);
    let want_meta = has_flag(&args, "--meta");
    let want_analyze = has_flag(&args, "--analyze");
    let images_dir = parse_arg_value(&args, "--images-dir").map(PathBuf::from);
    let export_path = parse_arg_value(&args, "--export").map(PathBuf::from);
    let manifest_path = parse_arg_value(&args, "--manifest").map(PathBuf::from);

    let mut config = match ConfigStore::default_config_dir() {
        Some(dir) => ConfigStore::new(dir).load()?,
        None => TriageConfig::default(),
    };
    if let Some(custom) = keywords_arg {
        config
            .custom_keywords
            .extend(custom.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    }

    let bytes = std::fs::read(&path).with_context(|| format!("read {}", path))?;
    let page_texts = PdfPageSource.page_texts(&bytes)?;

    let doc = classify_chunked(&page_texts, &config.active_keyword_categories()).await;
    println!("File: {}", path);
    println!(
        "Pages: {} total ({} text, {} drawing), {} chars extracted in {} ms",
        doc.total_pages,
        doc.text_pages.len(),
        doc.drawing_pages.len(),
        doc.total_chars,
        doc.processing_time_ms
    );
    if doc.is_likely_scanned {
        println!("Warning: very little text per page; this looks like a scanned PDF.");
    }

    let threshold = threshold_arg
        .or(config.default_threshold)
        .unwrap_or_else(|| auto_threshold(&doc.text_pages));
    println!("Threshold: {:.3}", threshold);

    let enabled: HashSet<String> = config
        .analysis_categories
        .iter()
        .filter(|c| c.enabled_by_default)
        .map(|c| c.id.clone())
        .collect();
    let mut session = TriageSession::new(&doc, Some(threshold), enabled.clone());

    println!(
        "Text pipeline: {} keep / {} discard",
        session.text().keep.len(),
        session.text().discard.len()
    );
    for page in session.text().keep.iter().take(top_n) {
        println!(
            "  p{:<5} score {:.3}  {}",
            page.page_number(),
            page.score,
            preview(&page.page.text_snippet, 70)
        );
    }

    if want_meta {
        let meta = extract(&page_texts, DEFAULT_META_PAGES);
        println!("Metadata (confidence {:.2}):", meta.confidence);
        println!("  client:  {}", meta.client_name.as_deref().unwrap_or("-"));
        println!("  venue:   {}", meta.venue.as_deref().unwrap_or("-"));
        println!("  title:   {}", meta.project_title.as_deref().unwrap_or("-"));
    }

    if want_analyze {
        let dir = match images_dir {
            Some(dir) => dir,
            None => bail!("--analyze requires --images-dir with pre-rendered page images"),
        };
        let client = VisionClient::new();
        if !client.has_api_key() {
            bail!("DOCTRIAGE_VISION_API_KEY is not set");
        }

        let renderer = DirRenderer::new(dir);
        let mut images = Vec::new();
        for page in &doc.drawing_pages {
            match renderer.render_full(page.page_number(), 1600).await {
                Ok(image_data) => images.push(PageImage {
                    page_index: page.page_index(),
                    page_number: page.page_number(),
                    image_data,
                }),
                Err(e) => warn!("skipping page {}: {}", page.page_number(), e),
            }
        }
        println!("Analyzing {} drawing pages...", images.len());

        let enabled_ids: Vec<String> = enabled.iter().cloned().collect();
        let results = analyze(
            Arc::new(client),
            images,
            &enabled_ids,
            &config.custom_instructions,
            |p| println!("  progress: {}/{}", p.completed, p.total),
            &CancelToken::new(),
        )
        .await;
        session.apply_analysis(&results);
        println!(
            "Drawing pipeline: {} keep / {} discard ({} flagged for review)",
            session.drawings().keep.len(),
            session.drawings().discard.len(),
            session.review_ids().len()
        );
    }

    let manifest = render_manifest(&session.manifest());
    match manifest_path {
        Some(path) => {
            std::fs::write(&path, &manifest).with_context(|| format!("write {}", path.display()))?;
            println!("Manifest written to {}", path.display());
        }
        None => {
            println!("{}", manifest);
        }
    }

    if let Some(out) = export_path {
        let indices = session.export_indices();
        let exported = export_document(&LopdfCopier, &bytes, &indices)?;
        std::fs::write(&out, exported).with_context(|| format!("write {}", out.display()))?;
        println!("Exported {} pages to {}", indices.len(), out.display());
    }

    Ok(())
}
