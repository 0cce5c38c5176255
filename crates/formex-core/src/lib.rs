//! Core library for enrollment-form OCR extraction.
//!
//! This crate provides:
//! - Region selection (full page, top lines, fractional crops, HSV color masks)
//! - OCR client adapters (Google Cloud Vision, OCR.space)
//! - Field extraction from a typed regex table with match policies and section scoping
//! - Batch orchestration with per-image failure isolation
//! - Spreadsheet export (XLSX, CSV)

pub mod batch;
pub mod error;
pub mod export;
pub mod fields;
pub mod models;
pub mod ocr;
pub mod region;

pub use batch::{BatchProcessor, CancelFlag, Extraction, Extractor, ImageInput};
pub use error::{FormexError, Result};
pub use export::{sink_for, ExportSink, Spreadsheet};
pub use fields::{FieldTable, FieldTableConfig, MatchPolicy};
pub use models::config::FormexConfig;
pub use models::record::{FieldValue, Outcome, Record, ResultSet};
pub use ocr::{create_client, OcrClient};
pub use region::{Region, RegionSet, RegionSpec};
