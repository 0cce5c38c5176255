//! OCR client adapters for remote recognition services.
//!
//! The rest of the pipeline sees OCR as `image bytes -> text`:
//! - **Vision**: Google Cloud Vision `images:annotate` (document text detection)
//! - **OcrSpace**: OCR.space-style form-encoded API
//!
//! Clients never retry and never cache; every call is one request.

mod ocr_space;
mod vision;

pub use ocr_space::OcrSpaceClient;
pub use vision::VisionClient;

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::OcrError;
use crate::models::config::{OcrBackendKind, OcrConfig};

/// A remote OCR service.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Recognize the text in a JPEG-encoded image.
    async fn recognize(&self, jpeg: &[u8]) -> Result<String, OcrError>;
}

/// Encode an image region as JPEG for upload.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, OcrError> {
    let rgb = image.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| OcrError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Build the HTTP client shared by the backends.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, OcrError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| OcrError::Init(e.to_string()))
}

/// Check an endpoint URL before any request is made.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<String, OcrError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| OcrError::Init(format!("invalid endpoint {}: {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(OcrError::Init(format!("unsupported endpoint scheme: {}", other))),
    }
}

/// Create the client selected by the configuration.
///
/// Fails when the API key is missing or the endpoint is unusable, before any
/// image is sent.
pub fn create_client(config: &OcrConfig) -> Result<Box<dyn OcrClient>, OcrError> {
    let client: Box<dyn OcrClient> = match config.backend {
        OcrBackendKind::Vision => Box::new(VisionClient::from_config(config)?),
        OcrBackendKind::OcrSpace => Box::new(OcrSpaceClient::from_config(config)?),
    };
    Ok(client)
}
