// Configuration Storage Service
// Handles triage config file read/write and version backup. Configuration is
// validated once at load time; the engine itself assumes a well-formed
// config everywhere else.

use crate::services::categories::{default_analysis_categories, AnalysisCategory};
use crate::services::keyword_bank::{
    custom_category, default_keyword_bank, KeywordCategory, CUSTOM_CATEGORY_ID,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to write config: {0}")]
    Write(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageConfig {
    pub version: String,
    #[serde(default = "default_keyword_bank")]
    pub keyword_categories: Vec<KeywordCategory>,
    #[serde(default = "default_analysis_categories")]
    pub analysis_categories: Vec<AnalysisCategory>,
    /// Session-level ad-hoc keywords, merged in as a weight-1 category.
    #[serde(default)]
    pub custom_keywords: Vec<String>,
    /// Fixed threshold override; None means derive automatically.
    #[serde(default)]
    pub default_threshold: Option<f64>,
    #[serde(default)]
    pub custom_instructions: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            keyword_categories: default_keyword_bank(),
            analysis_categories: default_analysis_categories(),
            custom_keywords: Vec::new(),
            default_threshold: None,
            custom_instructions: String::new(),
        }
    }
}

impl TriageConfig {
    /// Fail fast on malformed configuration instead of guarding every use
    /// site.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for cat in &self.keyword_categories {
            if cat.id.trim().is_empty() || cat.label.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "keyword category id and label must be non-empty".to_string(),
                ));
            }
            if !seen.insert(cat.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate keyword category id '{}'",
                    cat.id
                )));
            }
            for kw in &cat.keywords {
                if kw.text.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty keyword in category '{}'",
                        cat.id
                    )));
                }
                if kw.weight < 1 {
                    return Err(ConfigError::Invalid(format!(
                        "keyword '{}' in category '{}' has weight {}; minimum is 1",
                        kw.text, cat.id, kw.weight
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for cat in &self.analysis_categories {
            if cat.id.trim().is_empty() || cat.label.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "analysis category id and label must be non-empty".to_string(),
                ));
            }
            if cat.id == crate::models::FALLBACK_CATEGORY {
                return Err(ConfigError::Invalid(
                    "'other' is the implicit fallback category and cannot be configured"
                        .to_string(),
                ));
            }
            if !seen.insert(cat.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate analysis category id '{}'",
                    cat.id
                )));
            }
        }

        if let Some(threshold) = self.default_threshold {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "default threshold {} must be a non-negative number",
                    threshold
                )));
            }
        }

        Ok(())
    }

    /// The keyword categories the classifier should run with: the configured
    /// bank plus any custom keywords as their own category.
    pub fn active_keyword_categories(&self) -> Vec<KeywordCategory> {
        let mut categories: Vec<KeywordCategory> = self
            .keyword_categories
            .iter()
            .filter(|c| c.id != CUSTOM_CATEGORY_ID)
            .cloned()
            .collect();
        if !self.custom_keywords.is_empty() {
            let custom = custom_category(&self.custom_keywords);
            if !custom.keywords.is_empty() {
                categories.push(custom);
            }
        }
        categories
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self {
            config_dir,
            config_file,
        }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("doctriage"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Load and validate configuration; a missing file yields the defaults.
    pub fn load(&self) -> Result<TriageConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(TriageConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| ConfigError::Read(e.to_string()))?;
        let config: TriageConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &TriageConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(&self.config_file, content).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|e| ConfigError::Write(e.to_string()))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| ConfigError::Write(e.to_string()))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| ConfigError::Read(e.to_string()))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Sort by modification time (oldest first)
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        // Remove oldest entries
        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}
