//! Field extraction: pattern table, match policies, section scoping, text corrections.

mod corrections;
pub mod defaults;
pub mod patterns;
mod rule;
mod table;

pub use corrections::{Correction, TextCorrections};
pub use rule::{parse_date, FieldRule, FieldRuleConfig, MatchPolicy, ValueKind};
pub use table::{FieldTable, FieldTableConfig, SectionConfig};
