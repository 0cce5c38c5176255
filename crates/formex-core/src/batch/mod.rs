//! Batch orchestration.
//!
//! Images are processed independently: a failure in one image becomes an
//! error record and never aborts the rest of the batch. Output order always
//! equals input order, whatever the concurrency.

mod extractor;
mod orchestrator;

pub use extractor::{failure_message, Extraction, Extractor};
pub use orchestrator::{BatchProcessor, CANCELLED};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the bytes of an input image come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already in memory.
    Bytes(Vec<u8>),
    /// Read when the image is processed, so a batch holds only the images in flight.
    File(PathBuf),
}

impl ImageSource {
    /// Encoded image bytes.
    pub fn load(self) -> std::io::Result<Vec<u8>> {
        match self {
            ImageSource::Bytes(bytes) => Ok(bytes),
            ImageSource::File(path) => std::fs::read(path),
        }
    }
}

/// One input image.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// File name reported in the output.
    pub name: String,
    pub source: ImageSource,
}

impl ImageInput {
    /// An image whose encoded bytes (any format the decoder understands) are in memory.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: ImageSource::Bytes(bytes),
        }
    }

    /// An image read from `path` once its turn comes.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: ImageSource::File(path.into()),
        }
    }
}

/// Lifecycle of one image, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    OcrRequested,
    Parsed,
    Failed,
    Recorded,
}

/// Progress report after each finished image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
}

/// Shared flag asking a running batch to stop starting new images.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
