//! Field pattern table: ordered, validated rules plus the sections they are scoped to.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RuleError;
use crate::models::record::FieldValue;
use crate::region::{RegionSet, FULL_REGION};

use super::rule::{FieldRule, FieldRuleConfig};

/// A titled block of the form, e.g. one service category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    /// Pattern matching the section header.
    pub header: String,
}

impl SectionConfig {
    pub fn new(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: header.into(),
        }
    }
}

/// Serializable field table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldTableConfig {
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    pub rules: Vec<FieldRuleConfig>,
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    header: Regex,
}

/// Compiled field table. Rule order is output column order.
#[derive(Debug, Clone)]
pub struct FieldTable {
    sections: Vec<Section>,
    rules: Vec<FieldRule>,
}

impl FieldTable {
    /// Compile and validate a table.
    pub fn compile(config: &FieldTableConfig) -> Result<Self, RuleError> {
        let mut sections: Vec<Section> = Vec::with_capacity(config.sections.len());
        for section in &config.sections {
            if sections.iter().any(|s| s.name == section.name) {
                return Err(RuleError::DuplicateSection(section.name.clone()));
            }
            let header = Regex::new(&section.header).map_err(|source| RuleError::Pattern {
                field: format!("section {}", section.name),
                source,
            })?;
            sections.push(Section {
                name: section.name.clone(),
                header,
            });
        }

        let mut rules: Vec<FieldRule> = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            if rules.iter().any(|r| r.name == rule.name) {
                return Err(RuleError::DuplicateField(rule.name.clone()));
            }

            let section = match &rule.section {
                Some(name) => Some(
                    sections
                        .iter()
                        .position(|s| &s.name == name)
                        .ok_or_else(|| RuleError::UnknownSection {
                            field: rule.name.clone(),
                            section: name.clone(),
                        })?,
                ),
                None => None,
            };

            rules.push(FieldRule::compile(rule, section)?);
        }

        debug!(
            "Compiled field table: {} rules, {} sections",
            rules.len(),
            sections.len()
        );

        Ok(Self { sections, rules })
    }

    /// Check that every region tag names a defined region.
    pub fn check_regions(&self, regions: &RegionSet) -> Result<(), RuleError> {
        for rule in &self.rules {
            if let Some(region) = &rule.region {
                if !regions.contains(region) {
                    return Err(RuleError::UnknownRegion {
                        field: rule.name.clone(),
                        region: region.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Field names in column order.
    pub fn columns(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Name of the section a rule is confined to.
    pub fn section_of(&self, rule: &FieldRule) -> Option<&str> {
        rule.section.map(|i| self.sections[i].name.as_str())
    }

    /// Region names referenced by the table, `full` first, without duplicates.
    pub fn regions_used(&self) -> Vec<String> {
        let mut used: Vec<String> = Vec::new();
        for rule in &self.rules {
            let name = rule.region.as_deref().unwrap_or(FULL_REGION);
            if !used.iter().any(|u| u == name) {
                used.push(name.to_string());
            }
        }
        used.sort_by_key(|name| name != FULL_REGION);
        used
    }

    /// Text of section `index`: from the end of its header up to the next header of any section.
    fn section_text<'t>(&self, index: usize, text: &'t str) -> Option<&'t str> {
        let start = self.sections[index].header.find(text)?.end();

        let end = self
            .sections
            .iter()
            .filter_map(|s| s.header.find_at(text, start).map(|m| m.start()))
            .min()
            .unwrap_or(text.len());

        Some(&text[start..end])
    }

    fn extract_rule(&self, rule: &FieldRule, text: &str) -> Option<String> {
        match rule.section {
            Some(index) => {
                let scoped = self.section_text(index, text)?;
                rule.extract(scoped)
            }
            None => rule.extract(text),
        }
    }

    /// Run every rule against one text.
    pub fn parse(&self, text: &str) -> Vec<FieldValue> {
        self.rules
            .iter()
            .map(|rule| FieldValue::new(&rule.name, self.extract_rule(rule, text)))
            .collect()
    }

    /// Run every rule against the text of the region it is tagged with.
    ///
    /// A rule whose region has no text resolves to absent.
    pub fn parse_regions(&self, texts: &HashMap<String, String>) -> Vec<FieldValue> {
        self.rules
            .iter()
            .map(|rule| {
                let region = rule.region.as_deref().unwrap_or(FULL_REGION);
                let value = texts
                    .get(region)
                    .and_then(|text| self.extract_rule(rule, text));
                FieldValue::new(&rule.name, value)
            })
            .collect()
    }
}
