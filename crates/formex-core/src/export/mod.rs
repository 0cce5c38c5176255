//! Spreadsheet export.
//!
//! Every sink lays out the same table: `filename`, the field columns in table
//! order, then `error`. One row per record.

mod csv_sink;
mod xlsx;

pub use csv_sink::CsvSink;
pub use xlsx::XlsxSink;

use std::path::Path;

use crate::error::ExportError;
use crate::models::config::{ExportConfig, ExportFormat};
use crate::models::record::ResultSet;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_MIME: &str = "text/csv";

/// A serialized spreadsheet ready to be saved or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub file_name: String,
}

impl Spreadsheet {
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Serializes a result set into a spreadsheet format.
pub trait ExportSink {
    fn export(&self, results: &ResultSet) -> Result<Spreadsheet, ExportError>;
}

/// The sink selected by the export configuration.
pub fn sink_for(config: &ExportConfig) -> Box<dyn ExportSink> {
    match config.format {
        ExportFormat::Xlsx => Box::new(XlsxSink::new(
            config.file_name.clone().unwrap_or_else(|| "ocr_extracted.xlsx".to_string()),
            &config.sheet_name,
        )),
        ExportFormat::Csv => Box::new(CsvSink::new(
            config.file_name.clone().unwrap_or_else(|| "ocr_extracted.csv".to_string()),
        )),
    }
}

/// Drop characters XML 1.0 cannot carry. Tab, newline and carriage return survive.
pub(crate) fn xml_safe(value: &str) -> String {
    value
        .chars()
        .filter(|&c| {
            (c >= ' ' || matches!(c, '\t' | '\n' | '\r')) && !matches!(c, '\u{FFFE}' | '\u{FFFF}')
        })
        .collect()
}
