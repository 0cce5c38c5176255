use crate::error::ExportError;
use crate::models::record::ResultSet;

use super::{ExportSink, Spreadsheet, CSV_MIME};

/// UTF-8 byte order mark; spreadsheet apps need it to read Hangul correctly.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the result set as UTF-8 CSV.
#[derive(Debug, Clone)]
pub struct CsvSink {
    file_name: String,
}

impl CsvSink {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl ExportSink for CsvSink {
    fn export(&self, results: &ResultSet) -> Result<Spreadsheet, ExportError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());

        writer.write_record(results.header())?;
        for record in &results.records {
            writer.write_record(results.row(record))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;

        Ok(Spreadsheet {
            bytes,
            mime: CSV_MIME,
            file_name: self.file_name.clone(),
        })
    }
}
