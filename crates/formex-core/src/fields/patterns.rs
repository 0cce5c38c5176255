//! Common regex patterns for enrollment-form extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Service section headers. Each section runs until the next header of any section.
pub const INTERNET_HEADER: &str = r"U\+\s*인터넷";
pub const TV_PRIMARY_HEADER: &str = r"(?:U\+\s*)?TV\s*\(주\)";
pub const TV_SECONDARY_HEADER: &str = r"(?:U\+\s*)?TV\s*\(부\)";
pub const SMART_HOME_HEADER: &str = r"U\+\s*스마트홈";

// Label-value lines. The value may sit on the same line or the next one.

// Customer block
pub const NAME: &str = r"이름[:\t ]*\n?[\t ]*([가-힣A-Za-z· ]+)";
pub const PHONE: &str = r"전번[:\t ]*\n?[\t ]*([\d \-]+)";
pub const BIRTH: &str = r"생년[:\t ]*\n?[\t ]*(\d{6,8})";
pub const BUNDLE: &str = r"결합[:\t ]*\n?[\t ]*([가-힣A-Za-z0-9]+)";
pub const ADDRESS: &str = r"주소[:\t ]*\n?[\t ]*([^\s:][^\n]*)";

// Line counts next to each section header
pub const INTERNET_COUNT: &str = r"U\+\s*인터넷[:\t ]*([0-9]+)";
pub const TV_PRIMARY_COUNT: &str = r"U\+\s*TV\s*\(주\)[:\t ]*([0-9]+)";
pub const TV_SECONDARY_COUNT: &str = r"U\+\s*TV\s*\(부\)[:\t ]*([0-9]+)";
pub const SMART_HOME_COUNT: &str = r"U\+\s*스마트홈[:\t ]*([0-9]+)";

// Per-section lines
pub const PLAN: &str = r"요금제[:\t ]*\n?[\t ]*([^\s:][^\n]*)";
/// Contract period token `(YYYY-MM-DD~YYYY-MM-DD)`: group 1 is the start, group 2 the end.
pub const CONTRACT_PERIOD: &str =
    r"약정기간[^(\n]*\(\s*(\d{4}-\d{2}-\d{2})\s*~\s*(\d{4}-\d{2}-\d{2})\s*\)";
pub const DEVICE: &str = r"(?m)^[ \t]*단말[:\t ]*\n?[\t ]*([^\s:][^\n]*)";

// Page-level lines
pub const SHARED_DEVICE: &str = r"(?m)^[ \t]*공용단말[:\t ]*\n?[\t ]*([^\s:][^\n]*)";
pub const REQUESTED_DATE: &str = r"고객희망일[:\t ]*\n?[\t ]*([0-9\-]+)";
pub const AGENT: &str = r"(?:접수자|판매자|담당자)[:\t ]*\n?[\t ]*([가-힣A-Za-z ]+)";

lazy_static! {
    /// Strict `YYYY-MM-DD` shape, checked before calendar validation.
    pub static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();

    /// Carriage-return line endings some OCR backends emit.
    pub static ref CARRIAGE_RETURN: Regex = Regex::new(r"\r\n?").unwrap();
}
