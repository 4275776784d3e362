// Keyword Bank
// Weighted keyword registry driving the relevance scorer. The default bank
// covers the LED-display RFP domain; callers can replace or extend it
// through TriageConfig.

use serde::{Deserialize, Serialize};

/// A single weighted keyword or phrase. Weight 3+ marks a "high-value" term
/// that passes the scoring gate on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordEntry {
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// A named group of keywords that can be toggled as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordCategory {
    pub id: String,
    pub label: String,
    pub keywords: Vec<KeywordEntry>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Category id used for session-supplied ad-hoc keywords.
pub const CUSTOM_CATEGORY_ID: &str = "custom";

fn entry(text: &str, weight: u32) -> KeywordEntry {
    KeywordEntry {
        text: text.to_string(),
        weight,
    }
}

fn category(id: &str, label: &str, weight: u32, terms: &[&str]) -> KeywordCategory {
    KeywordCategory {
        id: id.to_string(),
        label: label.to_string(),
        keywords: terms.iter().map(|t| entry(t, weight)).collect(),
        enabled: true,
    }
}

/// Build a category for caller-supplied custom keywords (weight 1).
pub fn custom_category(terms: &[String]) -> KeywordCategory {
    KeywordCategory {
        id: CUSTOM_CATEGORY_ID.to_string(),
        label: "Custom".to_string(),
        keywords: terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| entry(t, 1))
            .collect(),
        enabled: true,
    }
}

/// The built-in LED display / venue RFP keyword bank.
pub fn default_keyword_bank() -> Vec<KeywordCategory> {
    vec![
        category(
            "display_hardware",
            "Display Hardware",
            3,
            &[
                "led display", "led screen", "led wall", "video display", "video wall",
                "video board", "scoreboard", "ribbon board", "fascia", "marquee",
                "digital signage", "display system", "led module", "led panel",
                "led tile", "led cabinet", "direct view led", "dvled", "fine pitch",
                "narrow pixel pitch", "smd led", "cob led", "micro led",
                "transparent led", "flexible led", "curved display", "outdoor led",
                "indoor led", "led mesh", "led curtain", "pixel board",
            ],
        ),
        category(
            "specs",
            "Display Specifications",
            2,
            &[
                "pixel pitch", "pixel density", "resolution", "brightness", "nit",
                "candela", "contrast ratio", "refresh rate", "viewing angle",
                "viewing distance", "color depth", "bit depth", "grayscale",
                "gamut", "hdr", "ip rating", "ip65", "ingress protection",
                "operating temperature", "power consumption", "wattage",
                "cabinet size", "module size", "aspect ratio", "scan rate",
                "uniformity", "mtbf", "lifespan", "luminance", "chromaticity",
            ],
        ),
        category(
            "electrical",
            "Electrical & Data",
            1,
            &[
                "electrical", "power distribution", "power supply", "pdu",
                "circuit breaker", "amperage", "voltage", "120v", "208v", "480v",
                "single phase", "three phase", "conduit", "wire gauge", "awg",
                "junction box", "disconnect", "transformer", "ups", "backup power",
                "generator", "ground fault", "gfci", "nec", "electrical code",
                "load calculation", "cat6", "fiber optic", "data cable", "ethernet",
                "network switch", "patch panel", "data drop", "single mode",
                "multi mode", "hdmi", "sdi", "displayport", "signal distribution",
                "video processor", "scaler", "switcher", "media player",
                "content management", "controller", "receiving card", "sending card",
            ],
        ),
        category(
            "structural",
            "Structural & Rigging",
            1,
            &[
                "structural", "steel", "mounting", "bracket", "cleat", "unistrut",
                "framing", "substrate", "rigging", "flyware", "truss", "hoist",
                "chain hoist", "load bearing", "dead load", "live load", "wind load",
                "seismic", "anchorage", "anchor bolt", "concrete embed", "welding",
                "galvanized", "powder coat", "stainless", "aluminum extrusion",
                "pe stamp", "structural engineer", "structural calculation",
                "deflection", "shear", "bearing plate", "base plate", "cantilever",
                "outrigger",
            ],
        ),
        category(
            "installation",
            "Installation & Service",
            1,
            &[
                "installation", "install", "labor", "man hours", "crew",
                "mobilization", "scaffolding", "boom lift", "scissor lift", "crane",
                "fall protection", "osha", "commissioning", "alignment",
                "calibration", "training", "warranty", "maintenance",
                "service agreement", "preventive maintenance", "spare parts",
                "on-site support", "remote support", "punch list",
                "substantial completion", "closeout", "as-built", "shop drawing",
                "submittal",
            ],
        ),
        category(
            "control_data",
            "Control Systems",
            2,
            &[
                "control system", "control room", "network operations center",
                "scheduling software", "playlist", "novastar", "brompton",
                "colorlight", "media server", "brightsign", "crestron", "extron",
                "dante", "artnet", "dmx", "rs232", "rs485", "api integration",
                "remote monitoring", "snmp", "redundancy", "failover",
            ],
        ),
        category(
            "permits_logistics",
            "Permits & Logistics",
            1,
            &[
                "permit", "building permit", "electrical permit", "inspection",
                "code compliance", "building code", "fire code", "ada", "zoning",
                "shipping", "freight", "crating", "customs", "tariff", "staging",
                "laydown area", "receiving dock", "delivery schedule", "lead time",
                "production schedule",
            ],
        ),
        category(
            "commercial",
            "Commercial & Contract",
            1,
            &[
                "bid form", "bid bond", "performance bond", "payment bond",
                "surety", "insurance", "certificate of insurance",
                "indemnification", "liquidated damages", "retainage",
                "change order", "rfi", "addendum", "scope of work",
                "specification", "division 11", "division 26", "division 27",
                "masterformat", "prevailing wage", "subcontractor",
                "general contractor", "engineer of record", "base bid",
                "alternate", "allowance", "unit price", "lump sum",
                "guaranteed maximum price", "schedule of values",
                "pay application", "progress payment",
            ],
        ),
        category(
            "manufacturers",
            "Manufacturers",
            2,
            &[
                "daktronics", "watchfire", "yaham", "absen", "leyard", "planar",
                "unilumin", "roe visual", "barco", "christie", "lighthouse",
                "sna displays", "nanolumens", "formetco", "vanguard", "dicolor",
                "aoto", "infiled", "megapixel vr",
            ],
        ),
    ]
}
