//! Per-image records and the batch result set.

use serde::{Deserialize, Serialize};

/// Column holding the source file name.
pub const FILENAME_COLUMN: &str = "filename";

/// Column holding the failure cause of an image.
pub const ERROR_COLUMN: &str = "error";

/// One extracted field. `value` is `None` when no rule match survived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<String>,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Either every field of the table, or the reason the image failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Fields(Vec<FieldValue>),
    Error(String),
}

/// Result of processing one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Source file name.
    pub file: String,

    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Record {
    pub fn extracted(file: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        Self {
            file: file.into(),
            outcome: Outcome::Fields(fields),
        }
    }

    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            outcome: Outcome::Error(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Fields(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            Outcome::Fields(_) => None,
        }
    }

    /// Value of a field, `None` when absent or when the image failed.
    pub fn get(&self, name: &str) -> Option<&str> {
        match &self.outcome {
            Outcome::Fields(fields) => fields
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.value.as_deref()),
            Outcome::Error(_) => None,
        }
    }

    /// Number of fields that resolved to a value.
    pub fn filled(&self) -> usize {
        match &self.outcome {
            Outcome::Fields(fields) => fields.iter().filter(|f| f.value.is_some()).count(),
            Outcome::Error(_) => 0,
        }
    }
}

/// Ordered records of one batch, plus the field columns in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.is_ok())
    }

    /// Header row: `filename`, the field columns, then `error`.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push(FILENAME_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        header.push(ERROR_COLUMN.to_string());
        header
    }

    /// Cells of one record aligned with [`ResultSet::header`]. Absent values are empty.
    pub fn row(&self, record: &Record) -> Vec<String> {
        let mut row = Vec::with_capacity(self.columns.len() + 2);
        row.push(record.file.clone());
        for column in &self.columns {
            row.push(record.get(column).unwrap_or_default().to_string());
        }
        row.push(record.error().unwrap_or_default().to_string());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_flat() {
        let ok = Record::extracted("a.jpg", vec![FieldValue::new("이름", Some("홍길동".into()))]);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["file"], "a.jpg");
        assert_eq!(json["fields"][0]["value"], "홍길동");
        assert!(json.get("error").is_none());

        let failed = Record::failed("b.jpg", "quota exceeded");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "quota exceeded");
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_rows_align_with_header() {
        let set = ResultSet::new(
            vec!["이름".into(), "전번".into()],
            vec![
                Record::extracted(
                    "a.jpg",
                    vec![
                        FieldValue::new("이름", Some("홍길동".into())),
                        FieldValue::new("전번", None),
                    ],
                ),
                Record::failed("b.jpg", "bad image"),
            ],
        );

        assert_eq!(set.header(), vec!["filename", "이름", "전번", "error"]);
        assert_eq!(set.row(&set.records[0]), vec!["a.jpg", "홍길동", "", ""]);
        assert_eq!(set.row(&set.records[1]), vec!["b.jpg", "", "", "bad image"]);
        assert_eq!(set.failed().count(), 1);
    }
}
