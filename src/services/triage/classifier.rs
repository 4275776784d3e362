// Page Classifier & Scorer
// Pure classification pass: splits pages into text/drawing by extracted-text
// volume, scores text pages against the weighted keyword bank, and derives
// the auto threshold for the initial keep/discard split.

use crate::models::{
    ClassifiedDocument, Page, PageType, Recommendation, ScoredPage,
};
use crate::services::keyword_bank::KeywordCategory;
use regex::Regex;
use std::time::Instant;

/// Pages with less extracted text than this are treated as drawings.
pub const DRAWING_TEXT_THRESHOLD: usize = 50;
/// Whole-document average below this flags a likely scanned (image-only) PDF.
const SCANNED_AVG_CHARS: usize = 50;
/// Keyword weight at or above this passes the scoring gate on its own.
const HIGH_VALUE_WEIGHT: u32 = 3;
const SNIPPET_MAX_CHARS: usize = 200;
const NO_TEXT_SNIPPET: &str = "no text detected";
/// Absolute floor for the automatic threshold.
const AUTO_THRESHOLD_FLOOR: f64 = 0.05;
/// Relative score drop that counts as a cliff when hunting for a gap.
const GAP_DROP_RATIO: f64 = 0.30;
/// Pages per chunk before yielding back to the runtime.
const CLASSIFY_CHUNK_PAGES: usize = 64;

/// Lowercase, strip filename-style separators, collapse whitespace.
/// Applied identically to page text and keywords so matches line up.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| match c {
            '.' | '-' | '_' | '/' | '\\' => ' ',
            other => other,
        })
        .collect();
    let ws_re = Regex::new(r"\s+").unwrap();
    ws_re.replace_all(&stripped, " ").trim().to_string()
}

/// A keyword compiled against the active configuration.
struct ActiveKeyword {
    text: String,
    weight: u32,
    category_id: String,
    pattern: Regex,
}

fn compile_keywords(categories: &[KeywordCategory]) -> Vec<ActiveKeyword> {
    let mut compiled = Vec::new();
    for cat in categories.iter().filter(|c| c.enabled) {
        for kw in &cat.keywords {
            let normalized = normalize_text(&kw.text);
            if normalized.is_empty() {
                continue;
            }
            // Whole-word/phrase boundary match, non-overlapping occurrences.
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&normalized)))
                .expect("escaped keyword pattern is always valid");
            compiled.push(ActiveKeyword {
                text: normalized,
                weight: kw.weight,
                category_id: cat.id.clone(),
                pattern,
            });
        }
    }
    compiled
}

struct ScoreDetail {
    score: f64,
    keyword_hits: u32,
    matched_keywords: Vec<String>,
    matched_categories: Vec<String>,
}

fn score_text(normalized: &str, keywords: &[ActiveKeyword]) -> ScoreDetail {
    let mut hits: u32 = 0;
    let mut total_weight: u64 = 0;
    let mut matched_keywords = Vec::new();
    let mut matched_categories: Vec<String> = Vec::new();
    let mut max_matched_weight: u32 = 0;

    for kw in keywords {
        let count = kw.pattern.find_iter(normalized).count() as u32;
        if count == 0 {
            continue;
        }
        hits += count;
        total_weight += u64::from(kw.weight) * u64::from(count);
        max_matched_weight = max_matched_weight.max(kw.weight);
        matched_keywords.push(kw.text.clone());
        if !matched_categories.iter().any(|c| c == &kw.category_id) {
            matched_categories.push(kw.category_id.clone());
        }
    }

    let unique_keywords = matched_keywords.len();

    // Gate: a single generic term repeated many times on a long page is
    // noise, not relevance.
    let gate_passes = unique_keywords >= 2 || max_matched_weight >= HIGH_VALUE_WEIGHT;
    let score = if hits == 0 || !gate_passes {
        0.0
    } else {
        let norm_len = normalized.chars().count().max(1) as f64;
        let density = total_weight as f64 / norm_len.sqrt();
        let diversity_bonus = (unique_keywords as f64 / 3.0).min(2.0);
        density * (1.0 + diversity_bonus * 0.5)
    };

    ScoreDetail {
        score,
        keyword_hits: hits,
        matched_keywords,
        matched_categories,
    }
}

fn snippet_of(text: &str) -> String {
    text.trim()
        .chars()
        .take(SNIPPET_MAX_CHARS)
        .collect::<String>()
        .replace('\n', " ")
}

fn recommendation_for(page_type: PageType, score: f64) -> Recommendation {
    match page_type {
        PageType::Drawing => Recommendation::Review,
        PageType::Text => {
            if score >= 0.3 {
                Recommendation::Keep
            } else if score > 0.0 {
                Recommendation::Maybe
            } else {
                Recommendation::Discard
            }
        }
    }
}

fn classify_page(page_index: usize, text: &str, keywords: &[ActiveKeyword]) -> ScoredPage {
    let trimmed = text.trim();
    let char_count = trimmed.chars().count();
    let has_text = char_count > 0;

    if char_count < DRAWING_TEXT_THRESHOLD {
        let snippet = if has_text {
            snippet_of(text)
        } else {
            NO_TEXT_SNIPPET.to_string()
        };
        return ScoredPage {
            page: Page {
                page_index,
                page_number: page_index + 1,
                page_type: PageType::Drawing,
                text_length: char_count,
                text_snippet: snippet,
                has_text,
            },
            score: 0.0,
            keyword_hits: 0,
            matched_keywords: Vec::new(),
            matched_categories: Vec::new(),
            recommendation: Recommendation::Review,
        };
    }

    let normalized = normalize_text(trimmed);
    let detail = score_text(&normalized, keywords);
    ScoredPage {
        page: Page {
            page_index,
            page_number: page_index + 1,
            page_type: PageType::Text,
            text_length: char_count,
            text_snippet: snippet_of(text),
            has_text: true,
        },
        score: detail.score,
        keyword_hits: detail.keyword_hits,
        matched_keywords: detail.matched_keywords,
        matched_categories: detail.matched_categories,
        recommendation: recommendation_for(PageType::Text, detail.score),
    }
}

fn assemble(pages: Vec<ScoredPage>, total_chars: usize, started: Instant) -> ClassifiedDocument {
    let total_pages = pages.len();
    let is_likely_scanned = total_pages > 0 && total_chars / total_pages < SCANNED_AVG_CHARS;
    let (mut text_pages, mut drawing_pages): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
    for page in pages {
        match page.page.page_type {
            PageType::Text => text_pages.push(page),
            PageType::Drawing => drawing_pages.push(page),
        }
    }
    ClassifiedDocument {
        text_pages,
        drawing_pages,
        total_pages,
        total_chars,
        is_likely_scanned,
        processing_time_ms: started.elapsed().as_millis() as u64,
    }
}

/// Classify and score every page of a document. Pure and deterministic:
/// identical inputs always produce identical output.
pub fn classify(page_texts: &[String], categories: &[KeywordCategory]) -> ClassifiedDocument {
    let started = Instant::now();
    let keywords = compile_keywords(categories);
    let mut total_chars = 0usize;
    let mut pages = Vec::with_capacity(page_texts.len());
    for (idx, text) in page_texts.iter().enumerate() {
        total_chars += text.trim().chars().count();
        pages.push(classify_page(idx, text, &keywords));
    }
    assemble(pages, total_chars, started)
}

/// Same pass as `classify`, yielding to the runtime between fixed-size page
/// chunks so a many-thousand-page document does not starve the event loop.
pub async fn classify_chunked(
    page_texts: &[String],
    categories: &[KeywordCategory],
) -> ClassifiedDocument {
    let started = Instant::now();
    let keywords = compile_keywords(categories);
    let mut total_chars = 0usize;
    let mut pages = Vec::with_capacity(page_texts.len());
    for chunk_start in (0..page_texts.len()).step_by(CLASSIFY_CHUNK_PAGES) {
        let chunk_end = (chunk_start + CLASSIFY_CHUNK_PAGES).min(page_texts.len());
        for idx in chunk_start..chunk_end {
            let text = &page_texts[idx];
            total_chars += text.trim().chars().count();
            pages.push(classify_page(idx, text, &keywords));
        }
        tokio::task::yield_now().await;
    }
    assemble(pages, total_chars, started)
}

/// Suggest a keep/discard threshold from the score distribution: the more
/// aggressive of a top-decile percentile cutoff and the midpoint of the
/// steepest score cliff, floored at an absolute minimum.
pub fn auto_threshold(text_pages: &[ScoredPage]) -> f64 {
    let mut scores: Vec<f64> = text_pages
        .iter()
        .map(|p| p.score)
        .filter(|s| *s > 0.0)
        .collect();
    if scores.is_empty() {
        return AUTO_THRESHOLD_FLOOR;
    }
    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let target_keep = ((scores.len() as f64) * 0.10).ceil().max(10.0) as usize;
    let percentile_cutoff = scores[target_keep.min(scores.len()) - 1];

    let window = (2 * target_keep).min(scores.len());
    let mut gap_threshold = 0.0f64;
    let mut steepest = 0.0f64;
    for i in 0..window.saturating_sub(1) {
        let drop = (scores[i] - scores[i + 1]) / scores[i];
        if drop > GAP_DROP_RATIO && drop > steepest {
            steepest = drop;
            gap_threshold = (scores[i] + scores[i + 1]) / 2.0;
        }
    }

    percentile_cutoff.max(gap_threshold).max(AUTO_THRESHOLD_FLOOR)
}
