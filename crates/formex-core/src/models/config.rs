//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{FormexError, OcrError};
use crate::fields::{defaults, Correction, FieldTable, FieldTableConfig, TextCorrections};
use crate::region::{NamedRegion, RegionSet, RegionSpec};

/// Main configuration for formex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormexConfig {
    /// OCR backend configuration.
    pub ocr: OcrConfig,

    /// Named regions field rules can read from. `full` is implicit.
    pub regions: Vec<NamedRegion>,

    /// Field table. `None` selects the built-in enrollment form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldTableConfig>,

    /// Literal OCR text fixes applied before parsing.
    pub corrections: Vec<Correction>,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Spreadsheet output configuration.
    pub export: ExportConfig,
}

impl Default for FormexConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            regions: vec![
                NamedRegion::new(defaults::FOOTER_REGION, RegionSpec::footer()),
                NamedRegion::new(defaults::STICKER_REGION, RegionSpec::yellow_sticker()),
            ],
            fields: None,
            corrections: TextCorrections::korean_defaults(),
            batch: BatchConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Which OCR service to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendKind {
    /// Google Cloud Vision `images:annotate` with an API key.
    #[default]
    Vision,
    /// OCR.space-compatible form-encoded API.
    OcrSpace,
}

/// OCR client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Backend service.
    pub backend: OcrBackendKind,

    /// API key given literally. Takes precedence over `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Language hint (ISO 639-2, e.g. "kor").
    pub language: String,

    /// Endpoint override; the backend's public URL when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// JPEG quality (1-100) used when uploading regions.
    pub jpeg_quality: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Vision,
            api_key: None,
            api_key_env: "FORMEX_OCR_API_KEY".to_string(),
            language: "kor".to_string(),
            endpoint: None,
            timeout_secs: 60,
            jpeg_quality: 90,
        }
    }
}

impl OcrConfig {
    /// Find the API key: literal value first, then the environment.
    pub fn resolve_api_key(&self) -> Result<String, OcrError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(OcrError::Init(format!(
                "no API key: set ocr.api_key or ${}",
                self.api_key_env
            ))),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Images processed at once. 1 processes strictly in sequence.
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Spreadsheet format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

/// Spreadsheet output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,

    /// Download file name. Defaults per format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Worksheet name (XLSX only).
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Xlsx,
            file_name: None,
            sheet_name: "Sheet1".to_string(),
        }
    }
}

impl FormexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// The configured field table description, or the built-in one.
    pub fn field_table_config(&self) -> FieldTableConfig {
        self.fields.clone().unwrap_or_else(defaults::enrollment_form)
    }

    /// Compile the field table and check it against the configured regions.
    pub fn field_table(&self) -> Result<FieldTable, FormexError> {
        let table = FieldTable::compile(&self.field_table_config())?;
        table.check_regions(&self.region_set()?)?;
        Ok(table)
    }

    pub fn region_set(&self) -> Result<RegionSet, FormexError> {
        Ok(RegionSet::new(self.regions.clone())?)
    }

    pub fn text_corrections(&self) -> Result<TextCorrections, FormexError> {
        Ok(TextCorrections::new(self.corrections.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FormexConfig::default();
        let table = config.field_table().unwrap();
        assert!(table.columns().contains(&"접수자".to_string()));
        assert!(!config.text_corrections().unwrap().is_empty());
    }

    #[test]
    fn test_default_regions_are_all_read() {
        let config = FormexConfig::default();
        let table = config.field_table().unwrap();
        let used = table.regions_used();

        for region in &config.regions {
            assert!(used.contains(&region.name), "region {} is never read", region.name);
        }
        let extractor = crate::batch::Extractor::from_config(&config).unwrap();
        assert_eq!(extractor.region_names(), vec!["full", "sticker", "footer"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FormexConfig =
            serde_json::from_str(r#"{"ocr":{"backend":"ocr_space"},"batch":{"concurrency":3}}"#).unwrap();
        assert_eq!(config.ocr.backend, OcrBackendKind::OcrSpace);
        assert_eq!(config.ocr.language, "kor");
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.export.format, ExportFormat::Xlsx);
        assert_eq!(config.regions.len(), 2);
    }

    #[test]
    fn test_unknown_region_in_custom_table() {
        let config: FormexConfig = serde_json::from_str(
            r#"{"regions":[],"fields":{"rules":[{"name":"a","pattern":"a(b)","region":"footer"}]}}"#,
        )
        .unwrap();
        assert!(matches!(config.field_table(), Err(FormexError::Rule(_))));
    }

    #[test]
    fn test_literal_api_key_wins() {
        let config = OcrConfig {
            api_key: Some(" secret ".to_string()),
            api_key_env: "FORMEX_TEST_UNSET_VARIABLE".to_string(),
            ..OcrConfig::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "secret");

        let missing = OcrConfig {
            api_key: None,
            api_key_env: "FORMEX_TEST_UNSET_VARIABLE".to_string(),
            ..OcrConfig::default()
        };
        assert!(matches!(missing.resolve_api_key(), Err(OcrError::Init(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FormexConfig::default();
        config.batch.concurrency = 4;
        config.save(&path).unwrap();

        let loaded = FormexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.batch.concurrency, 4);
        assert_eq!(loaded.regions, config.regions);
    }
}
