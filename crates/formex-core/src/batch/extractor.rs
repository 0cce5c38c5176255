//! Single-image extraction: region selection, OCR, corrections, field parsing.

use std::collections::HashMap;

use image::DynamicImage;
use tracing::debug;

use crate::error::{FormexError, OcrError, Result};
use crate::fields::{FieldTable, TextCorrections};
use crate::models::config::FormexConfig;
use crate::models::record::FieldValue;
use crate::ocr::{encode_jpeg, OcrClient};
use crate::region::{RegionSet, RegionSpec};

use super::ImageState;

/// Everything extracted from one image.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Field values in table order.
    pub fields: Vec<FieldValue>,
    /// Corrected OCR text per region name.
    pub texts: HashMap<String, String>,
}

/// Validated extraction plan: which regions to OCR and how to parse them.
#[derive(Debug, Clone)]
pub struct Extractor {
    regions: Vec<(String, RegionSpec)>,
    table: FieldTable,
    corrections: TextCorrections,
    jpeg_quality: u8,
}

impl Extractor {
    /// Build a plan from validated parts. Every region the table uses must exist in `regions`.
    pub fn new(
        table: FieldTable,
        regions: &RegionSet,
        corrections: TextCorrections,
        jpeg_quality: u8,
    ) -> Result<Self> {
        table.check_regions(regions)?;

        let regions = table
            .regions_used()
            .into_iter()
            .map(|name| {
                let spec = regions
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| FormexError::Config(format!("unknown region {}", name)))?;
                Ok((name, spec))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            regions,
            table,
            corrections,
            jpeg_quality,
        })
    }

    /// Build the plan described by the configuration.
    pub fn from_config(config: &FormexConfig) -> Result<Self> {
        Self::new(
            config.field_table()?,
            &config.region_set()?,
            config.text_corrections()?,
            config.ocr.jpeg_quality,
        )
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// Names of the regions sent to OCR for every image, in request order.
    pub fn region_names(&self) -> Vec<&str> {
        self.regions.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Decode `bytes` and extract every field.
    pub async fn extract_bytes(
        &self,
        client: &dyn OcrClient,
        file: &str,
        bytes: &[u8],
    ) -> Result<Extraction> {
        let image = image::load_from_memory(bytes)?;
        self.extract(client, file, &image).await
    }

    /// Run every region through OCR and parse the resulting texts.
    pub async fn extract(
        &self,
        client: &dyn OcrClient,
        file: &str,
        image: &DynamicImage,
    ) -> Result<Extraction> {
        let mut texts = HashMap::with_capacity(self.regions.len());

        for (name, spec) in &self.regions {
            let cropped = spec.select(image);
            let jpeg = encode_jpeg(&cropped, self.jpeg_quality)?;

            debug!(
                "{}: {:?} region={} backend={}",
                file,
                ImageState::OcrRequested,
                name,
                client.name()
            );
            let raw = client.recognize(&jpeg).await?;
            let text = spec.restrict_text(&self.corrections.apply(&raw));
            debug!("{}: region {} yielded {} chars", file, name, text.chars().count());

            texts.insert(name.clone(), text);
        }

        let fields = self.table.parse_regions(&texts);
        debug!(
            "{}: {:?} ({} of {} fields filled)",
            file,
            ImageState::Parsed,
            fields.iter().filter(|f| f.value.is_some()).count(),
            fields.len()
        );

        Ok(Extraction { fields, texts })
    }
}

/// Text shown in the error column for a failed image.
///
/// Backend-reported failures are passed through verbatim.
pub fn failure_message(err: &FormexError) -> String {
    match err {
        FormexError::Ocr(OcrError::Backend(message)) => message.clone(),
        other => other.to_string(),
    }
}
