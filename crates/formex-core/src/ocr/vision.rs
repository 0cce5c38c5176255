//! Google Cloud Vision document text detection over REST.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{http_client, parse_endpoint, OcrClient};

const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Client for the Vision `images:annotate` endpoint, authenticated by API key.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl VisionClient {
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = config.resolve_api_key()?;
        let endpoint = parse_endpoint(config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            endpoint,
            api_key,
            language: vision_language(&config.language).to_string(),
        })
    }
}

#[async_trait]
impl OcrClient for VisionClient {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, jpeg: &[u8]) -> Result<String, OcrError> {
        let body = serde_json::json!({
            "requests": [{
                "image": { "content": STANDARD.encode(jpeg) },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                "imageContext": { "languageHints": [self.language] }
            }]
        });

        debug!("Sending {} bytes to Vision", jpeg.len());
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(OcrError::Transport(match error_message(&text) {
                Some(message) => format!("HTTP {}: {}", status, message),
                None => format!("HTTP {}", status),
            }));
        }

        decode_response(&text)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Extract text from a successful HTTP response body.
///
/// The per-image `error` must be checked even though the HTTP call succeeded.
fn decode_response(body: &str) -> Result<String, OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::Transport(format!("malformed response body: {}", e)))?;

    let response = parsed
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::Transport("malformed response body: no responses".to_string()))?;

    if let Some(error) = response.error {
        if !error.message.is_empty() {
            return Err(OcrError::Backend(error.message));
        }
    }

    Ok(response
        .full_text_annotation
        .map(|a| a.text)
        .unwrap_or_default())
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

/// Vision expects BCP-47 hints; map the three-letter codes used by the config.
fn vision_language(language: &str) -> &str {
    match language {
        "kor" => "ko",
        "eng" => "en",
        "jpn" => "ja",
        "chs" | "zho" => "zh",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_server;

    fn client_for(url: &str) -> VisionClient {
        VisionClient::from_config(&OcrConfig {
            api_key: Some("k".to_string()),
            endpoint: Some(format!("{}/v1/images:annotate", url)),
            timeout_secs: 5,
            ..OcrConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_decode_text() {
        let body = r#"{"responses":[{"fullTextAnnotation":{"text":"이름: 홍길동\n전번: 010"}}]}"#;
        assert_eq!(decode_response(body).unwrap(), "이름: 홍길동\n전번: 010");
    }

    #[test]
    fn test_decode_no_text_is_empty() {
        assert_eq!(decode_response(r#"{"responses":[{}]}"#).unwrap(), "");
    }

    #[test]
    fn test_decode_backend_error_verbatim() {
        let body = r#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
        match decode_response(body) {
            Err(OcrError::Backend(message)) => assert_eq!(message, "Bad image data."),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode_response("<html>"), Err(OcrError::Transport(_))));
        assert!(matches!(
            decode_response(r#"{"responses":[]}"#),
            Err(OcrError::Transport(_))
        ));
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("API key not valid."));
        assert_eq!(error_message("oops"), None);
    }

    #[test]
    fn test_language_mapping() {
        assert_eq!(vision_language("kor"), "ko");
        assert_eq!(vision_language("ko"), "ko");
    }

    #[tokio::test]
    async fn test_recognize_posts_json() {
        let body = r#"{"responses":[{"fullTextAnnotation":{"text":"전번: 010-1234-5678"}}]}"#;
        let (url, request) = test_server::respond_once("200 OK", body).await;

        let text = client_for(&url).recognize(b"jpeg").await.unwrap();
        assert_eq!(text, "전번: 010-1234-5678");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /v1/images:annotate?key=k "));
        assert!(request.contains("application/json"));

        let json_start = request.find("\r\n\r\n").unwrap() + 4;
        let sent: serde_json::Value = serde_json::from_str(&request[json_start..]).unwrap();
        let first = &sent["requests"][0];
        assert_eq!(first["image"]["content"], "anBlZw==");
        assert_eq!(first["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
        assert_eq!(first["imageContext"]["languageHints"][0], "ko");
    }

    #[tokio::test]
    async fn test_recognize_http_error_carries_message() {
        let body = r#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#;
        let (url, _request) = test_server::respond_once("403 Forbidden", body).await;

        match client_for(&url).recognize(b"jpeg").await {
            Err(OcrError::Transport(message)) => {
                assert_eq!(message, "HTTP 403 Forbidden: API key not valid.")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
