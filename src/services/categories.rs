// Analysis Category Registry
// Categories the remote vision service can assign to a drawing page. The
// fallback category "other" is implicit and never configured; disabled
// categories are still reported by the service but always bucketed to
// discard.

use crate::models::FALLBACK_CATEGORY;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisCategory {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,
}

fn default_enabled() -> bool {
    true
}

fn category(id: &str, label: &str, description: &str, enabled_by_default: bool) -> AnalysisCategory {
    AnalysisCategory {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        enabled_by_default,
    }
}

/// Built-in categories for architectural drawing analysis.
pub fn default_analysis_categories() -> Vec<AnalysisCategory> {
    vec![
        category(
            "display",
            "Display Drawing",
            "Elevations, sections, or plans showing LED displays, video boards, \
             scoreboards, ribbon boards, or digital signage",
            true,
        ),
        category(
            "electrical",
            "Electrical Drawing",
            "Power distribution, conduit routing, panel schedules, or data \
             riser diagrams serving display equipment",
            true,
        ),
        category(
            "structural",
            "Structural Drawing",
            "Steel framing, rigging, or mounting details supporting display \
             equipment",
            true,
        ),
        category(
            "signage",
            "Signage Schedule",
            "Signage location plans and schedules, including static signage \
             that may be targeted for digital conversion",
            true,
        ),
    ]
}

/// Ids of the categories enabled by default.
pub fn default_enabled_ids(categories: &[AnalysisCategory]) -> Vec<String> {
    categories
        .iter()
        .filter(|c| c.enabled_by_default)
        .map(|c| c.id.clone())
        .collect()
}

/// Display label for a category id, falling back to the id itself.
pub fn label_for(categories: &[AnalysisCategory], id: &str) -> String {
    if id == FALLBACK_CATEGORY {
        return "Other".to_string();
    }
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.label.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Membership set for bucketing decisions.
pub fn enabled_set(ids: &[String]) -> HashSet<String> {
    ids.iter().map(|s| s.trim().to_string()).collect()
}
