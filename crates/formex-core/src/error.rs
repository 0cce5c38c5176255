//! Error types for the formex-core library.

use thiserror::Error;

/// Main error type for the formex library.
#[derive(Error, Debug)]
pub enum FormexError {
    /// OCR backend or transport error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field rule table error.
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// Invalid region definition.
    #[error("region error: {0}")]
    Region(#[from] RegionError),

    /// Spreadsheet export error.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while talking to an OCR backend.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The backend processed the request and reported a failure.
    /// The message is the backend's own text.
    #[error("{0}")]
    Backend(String),

    /// Network failure, timeout, non-success status or unreadable body.
    #[error("OCR request failed: {0}")]
    Transport(String),

    /// The client could not be set up (missing key, bad endpoint).
    #[error("OCR client initialization failed: {0}")]
    Init(String),

    /// The region could not be encoded for upload.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for OcrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OcrError::Transport("request timed out".to_string())
        } else if let Some(status) = err.status() {
            OcrError::Transport(format!("HTTP {}", status))
        } else if err.is_decode() {
            OcrError::Transport("malformed response body".to_string())
        } else {
            OcrError::Transport(err.to_string())
        }
    }
}

/// Errors in the field rule table, detected at startup.
#[derive(Error, Debug)]
pub enum RuleError {
    /// Two rules share a field name.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// A pattern failed to compile.
    #[error("invalid pattern for {field}: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// The capture group index does not exist in the pattern.
    #[error("field {field} uses capture group {group} but the pattern has {available}")]
    MissingGroup {
        field: String,
        group: usize,
        available: usize,
    },

    /// A rule names a section that is not defined.
    #[error("field {field} refers to unknown section {section}")]
    UnknownSection { field: String, section: String },

    /// A rule names a region that is not defined.
    #[error("field {field} refers to unknown region {region}")]
    UnknownRegion { field: String, region: String },

    /// A section name is defined twice.
    #[error("duplicate section name: {0}")]
    DuplicateSection(String),

    /// A text correction has an empty search string.
    #[error("text correction #{0} has an empty search string")]
    EmptyCorrection(usize),
}

/// Errors in region definitions.
#[derive(Error, Debug)]
pub enum RegionError {
    /// Fractional crop coordinates outside [0, 1] or inverted.
    #[error("invalid fractional crop ({left}, {top}, {right}, {bottom})")]
    InvalidFraction {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },

    /// Hue bounds outside [0, 360).
    #[error("invalid hue range {0}..{1}")]
    InvalidHue(f32, f32),

    /// `TopLines(0)` selects nothing.
    #[error("top-lines region must keep at least one line")]
    ZeroLines,

    /// A region name is defined twice or shadows `full`.
    #[error("duplicate region name: {0}")]
    DuplicateName(String),
}

/// Errors raised while writing a spreadsheet.
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// ZIP container failure.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML writer failure.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error while assembling the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the formex library.
pub type Result<T> = std::result::Result<T, FormexError>;
