// Vision Analysis Client
// HTTP client for the remote drawing-analysis service. One request carries a
// batch of page images plus the enabled category ids and optional custom
// instructions; the response carries one result per image, in no particular
// order. Failed requests are surfaced as errors and never retried here: the
// orchestrator converts them to zero-confidence placeholders.

use crate::models::{AnalysisResult, PageImage};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const VISION_DEFAULT_URL: &str = "http://localhost:8089/api/v1";
const REQUEST_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("API key not configured")]
    MissingApiKey,
}

/// Seam between the orchestrator and the remote analysis service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze_batch(
        &self,
        images: &[PageImage],
        enabled_categories: &[String],
        custom_instructions: &str,
    ) -> Result<Vec<AnalysisResult>, AnalysisError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireImage {
    page_index: usize,
    page_number: usize,
    image_data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    request_id: String,
    images: Vec<WireImage>,
    enabled_categories: &'a [String],
    custom_instructions: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    #[serde(default)]
    results: Vec<AnalysisResult>,
}

fn encode_images(images: &[PageImage]) -> Vec<WireImage> {
    let engine = base64::engine::general_purpose::STANDARD;
    images
        .iter()
        .map(|img| WireImage {
            page_index: img.page_index,
            page_number: img.page_number,
            image_data: engine.encode(&img.image_data),
        })
        .collect()
}

pub struct VisionClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl Default for VisionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionClient {
    /// Build a client from the environment: `DOCTRIAGE_VISION_URL` and
    /// `DOCTRIAGE_VISION_API_KEY`.
    pub fn new() -> Self {
        let base_url =
            env::var("DOCTRIAGE_VISION_URL").unwrap_or_else(|_| VISION_DEFAULT_URL.to_string());
        let api_key = env::var("DOCTRIAGE_VISION_API_KEY").ok().filter(|k| !k.is_empty());
        Self::with_base_url(base_url, api_key)
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl AnalysisService for VisionClient {
    async fn analyze_batch(
        &self,
        images: &[PageImage],
        enabled_categories: &[String],
        custom_instructions: &str,
    ) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)?;

        let request = AnalyzeRequest {
            request_id: Uuid::new_v4().to_string(),
            images: encode_images(images),
            enabled_categories,
            custom_instructions,
        };
        debug!(
            "[VISION] analyze request_id={} images={}",
            request.request_id,
            request.images.len()
        );

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
        if parsed.results.is_empty() && !images.is_empty() {
            return Err(AnalysisError::Malformed("empty result set".to_string()));
        }
        Ok(parsed.results)
    }
}
