// Metadata Extractor
// Best-effort heuristic pass over leading-page text to guess client, venue,
// and project title. Label-anchored patterns first, then a title-like line
// scan as fallback. An empty field always beats a wrong guess: nothing is
// defaulted, interpolated, or merged with a prior result.

use crate::models::ExtractedMeta;
use regex::Regex;

pub const DEFAULT_META_PAGES: usize = 5;
const TITLE_SCAN_LINES: usize = 20;

/// Trim, collapse whitespace, strip trailing punctuation. Returns None for
/// captures too short to mean anything or with no letters at all.
fn tidy(capture: &str) -> Option<String> {
    let ws_re = Regex::new(r"\s+").unwrap();
    let collapsed = ws_re.replace_all(capture.trim(), " ").to_string();
    let cleaned = collapsed
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .trim()
        .to_string();
    if cleaned.chars().count() < 2 {
        return None;
    }
    if !cleaned.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    Some(cleaned)
}

fn first_capture(text: &str, patterns: &[&str]) -> Option<String> {
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(text) {
            if let Some(value) = caps.get(1).and_then(|m| tidy(m.as_str())) {
                return Some(value);
            }
        }
    }
    None
}

fn extract_client(text: &str) -> Option<String> {
    first_capture(
        text,
        &[
            r"(?im)^[ \t]*(?:prepared\s+for|client|owner)\s*[:：][ \t]*(.+)$",
            r"(?m)^[ \t]*[Pp]repared\s+for\s+(?:[Tt]he\s+)?([A-Z][A-Za-z'&.-]*(?:\s+[A-Z][A-Za-z'&.-]*)*)",
        ],
    )
}

fn extract_venue(text: &str) -> Option<String> {
    first_capture(
        text,
        &[
            r"(?im)^[ \t]*(?:venue|stadium|arena|facility)\s*[:：][ \t]*(.+)$",
            // "... at the Gainbridge Fieldhouse": capitalized name ending in
            // a venue noun. Case-sensitive on purpose.
            r"\bthe\s+([A-Z][A-Za-z'&-]*(?:\s+[A-Z][A-Za-z'&-]*)*\s+(?:Stadium|Arena|Fieldhouse|Center|Centre|Coliseum|Garden|Dome|Pavilion|Ballpark|Amphitheater))\b",
        ],
    )
}

fn extract_title_labeled(text: &str) -> Option<String> {
    first_capture(
        text,
        &[r"(?im)^[ \t]*(?:project(?:\s+(?:name|title))?|re|subject)\s*[:：][ \t]*(.+)$"],
    )
}

fn is_skippable_line(line: &str) -> bool {
    let skip_re = Regex::new(
        r"(?i)^(table of contents|contents|request for|prepared (?:for|by)|submitted (?:to|by)|issued (?:for|by)|(?:client|venue|owner|project|subject|re)\s*[:：]|page \d|\d+$|copyright|©|addendum|revision|dated?\b|\d{1,2}/\d{1,2}/\d{2,4}$|(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d)",
    )
    .unwrap();
    skip_re.is_match(line)
}

/// A line that reads like a document title: mid-length, starts with an
/// uppercase letter or a digit (years are common), no sentence-ending
/// punctuation, and not on the boilerplate skip list.
fn is_title_like(line: &str) -> bool {
    let char_count = line.chars().count();
    if !(8..=120).contains(&char_count) {
        return false;
    }
    let first = match line.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if !(first.is_uppercase() || first.is_ascii_digit()) {
        return false;
    }
    if line.ends_with('.') || line.ends_with(';') {
        return false;
    }
    !is_skippable_line(line)
}

fn extract_title_fallback(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(TITLE_SCAN_LINES)
        .find(|l| is_title_like(l))
        .and_then(tidy)
}

fn confidence_for(found: usize) -> f64 {
    match found {
        3 => 0.85,
        2 => 0.6,
        1 => 0.35,
        _ => 0.0,
    }
}

/// Guess header metadata from up to `max_pages` leading pages of text.
pub fn extract(leading_pages: &[String], max_pages: usize) -> ExtractedMeta {
    let text = leading_pages
        .iter()
        .take(max_pages)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    let client_name = extract_client(&text);
    let venue = extract_venue(&text);
    let project_title =
        extract_title_labeled(&text).or_else(|| extract_title_fallback(&text));

    let found = [&client_name, &venue, &project_title]
        .iter()
        .filter(|f| f.is_some())
        .count();

    ExtractedMeta {
        client_name,
        venue,
        project_title,
        confidence: confidence_for(found),
    }
}
