//! OCR.space-style form-encoded OCR API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{http_client, parse_endpoint, OcrClient};

const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Client for a form-encoded `parse/image` endpoint.
pub struct OcrSpaceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl OcrSpaceClient {
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = config.resolve_api_key()?;
        let endpoint = parse_endpoint(config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            endpoint,
            api_key,
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl OcrClient for OcrSpaceClient {
    fn name(&self) -> &str {
        "ocr.space"
    }

    async fn recognize(&self, jpeg: &[u8]) -> Result<String, OcrError> {
        let data_uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));
        let form = [
            ("apikey", self.api_key.as_str()),
            ("language", self.language.as_str()),
            ("isOverlayRequired", "false"),
            ("base64Image", data_uri.as_str()),
        ];

        debug!("Sending {} bytes to OCR.space", jpeg.len());
        let resp = self.http.post(&self.endpoint).form(&form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OcrError::Transport(format!("HTTP {}", status)));
        }

        let text = resp.text().await?;
        decode_response(&text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    // Any of these may be present as an explicit null.
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: Option<bool>,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
    #[serde(default)]
    error_details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

/// `ErrorMessage` and `ErrorDetails` come as a string or as an array of strings.
fn flatten_message(value: &serde_json::Value) -> Option<String> {
    let message = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    (!message.is_empty()).then_some(message)
}

fn decode_response(body: &str) -> Result<String, OcrError> {
    let parsed: ParseResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::Transport(format!("malformed response body: {}", e)))?;

    if parsed.is_errored_on_processing.unwrap_or(false) {
        let message = parsed
            .error_message
            .as_ref()
            .and_then(flatten_message)
            .or_else(|| parsed.error_details.as_ref().and_then(flatten_message))
            .unwrap_or_else(|| "OCR processing failed".to_string());
        return Err(OcrError::Backend(message));
    }

    parsed
        .parsed_results
        .unwrap_or_default()
        .into_iter()
        .next()
        .map(|r| r.parsed_text.unwrap_or_default())
        .ok_or_else(|| OcrError::Transport("malformed response body: no parsed results".to_string()))
}
