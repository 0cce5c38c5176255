//! Field rules: a pattern plus the policy for picking among its matches.

use chrono::NaiveDate;
use regex::{Match, Regex};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::RuleError;

use super::patterns::ISO_DATE;

/// Which of several matches a rule resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// First match in the text.
    #[default]
    First,
    /// Last match in the text.
    Last,
    /// Zero-based match index.
    Nth(usize),
    /// Last match when the label occurs two or more times, otherwise the only match.
    /// For labels printed once as a template prompt and once with the filled value.
    LastIfAmbiguous,
}

impl MatchPolicy {
    /// Index of the selected match among `count` matches.
    pub fn pick(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }

        match *self {
            MatchPolicy::First => Some(0),
            MatchPolicy::Last => Some(count - 1),
            MatchPolicy::Nth(n) => (n < count).then_some(n),
            MatchPolicy::LastIfAmbiguous => {
                if count >= 2 {
                    Some(count - 1)
                } else {
                    Some(0)
                }
            }
        }
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPolicy::First => write!(f, "first"),
            MatchPolicy::Last => write!(f, "last"),
            MatchPolicy::Nth(n) => write!(f, "nth({})", n),
            MatchPolicy::LastIfAmbiguous => write!(f, "last-if-ambiguous"),
        }
    }
}

/// Shape of the captured value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Free text, kept as captured (trimmed).
    #[default]
    Text,
    /// `YYYY-MM-DD` calendar date; anything else resolves to absent.
    Date,
}

fn default_group() -> usize {
    1
}

/// Serializable description of a field rule, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleConfig {
    /// Output column name. Unique within a table.
    pub name: String,

    /// Regular expression searched in the text.
    pub pattern: String,

    /// Capture group holding the value.
    #[serde(default = "default_group")]
    pub group: usize,

    /// Match selection policy.
    #[serde(default)]
    pub policy: MatchPolicy,

    /// Region whose text the rule reads (default: `full`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Section the rule is confined to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Labels that mean "no value" when captured. A value whose line, from
    /// the value onwards, is one of them or starts with one followed by `:`
    /// or whitespace is absent. Covers a blank label whose capture ran onto
    /// the next label's line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reject: Vec<String>,

    /// Value shape.
    #[serde(default)]
    pub kind: ValueKind,
}

impl FieldRuleConfig {
    /// Rule reading capture group 1 of `pattern`, first match, full page.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            group: 1,
            policy: MatchPolicy::First,
            region: None,
            section: None,
            reject: Vec::new(),
            kind: ValueKind::Text,
        }
    }

    pub fn group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn reject(mut self, literal: impl Into<String>) -> Self {
        self.reject.push(literal.into());
        self
    }

    pub fn rejects<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reject.extend(literals.into_iter().map(Into::into));
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A compiled field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub(crate) name: String,
    pub(crate) pattern: Regex,
    pub(crate) group: usize,
    pub(crate) policy: MatchPolicy,
    pub(crate) region: Option<String>,
    pub(crate) section: Option<usize>,
    pub(crate) reject: Vec<String>,
    pub(crate) kind: ValueKind,
}

impl FieldRule {
    /// Compile a rule. `section` is the already-resolved section index.
    pub(crate) fn compile(config: &FieldRuleConfig, section: Option<usize>) -> Result<Self, RuleError> {
        let pattern = Regex::new(&config.pattern).map_err(|source| RuleError::Pattern {
            field: config.name.clone(),
            source,
        })?;

        // captures_len counts the implicit whole-match group 0.
        let available = pattern.captures_len() - 1;
        if config.group > available {
            return Err(RuleError::MissingGroup {
                field: config.name.clone(),
                group: config.group,
                available,
            });
        }

        Ok(Self {
            name: config.name.clone(),
            pattern,
            group: config.group,
            policy: config.policy,
            region: config.region.clone(),
            section,
            reject: config.reject.clone(),
            kind: config.kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Region the rule reads from, `None` meaning the full page.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// All candidate values in `text`, in match order, before selection.
    pub fn candidates<'t>(&self, text: &'t str) -> Vec<Option<&'t str>> {
        self.matches(text)
            .into_iter()
            .map(|m| m.map(|m| m.as_str()))
            .collect()
    }

    /// Value group of every match. When a value is rejected as a label, the
    /// next search resumes at that label so it can still produce its own match.
    fn matches<'t>(&self, text: &'t str) -> Vec<Option<Match<'t>>> {
        let mut found = Vec::new();
        let mut at = 0;

        while let Some(caps) = self.pattern.captures_at(text, at) {
            let whole = caps.get(0).map_or(at..at, |m| m.range());
            let value = caps.get(self.group);
            found.push(value);

            at = match value {
                Some(m) if m.start() > whole.start && self.is_rejected_at(text, m.start()) => m.start(),
                _ => whole.end,
            };
            if at == whole.start {
                // Empty match: step over one character.
                match text[at..].chars().next() {
                    Some(c) => at += c.len_utf8(),
                    None => break,
                }
            }
        }
        found
    }

    /// The line starting at `start` begins with a reject label, either alone
    /// or followed by `:` or whitespace.
    fn is_rejected_at(&self, text: &str, start: usize) -> bool {
        let line = text[start..].lines().next().unwrap_or("").trim();
        self.reject.iter().filter(|label| !label.is_empty()).any(|label| {
            line.strip_prefix(label.as_str()).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with(|c: char| c == ':' || c.is_whitespace())
            })
        })
    }

    /// Resolve the rule against `text`.
    pub fn extract(&self, text: &str) -> Option<String> {
        let matches = self.matches(text);
        let index = self.policy.pick(matches.len())?;

        if matches.len() > 1 {
            trace!(
                "{}: {} matches, {} picked #{}",
                self.name,
                matches.len(),
                self.policy,
                index
            );
        }

        let found = matches[index]?;
        let value = found.as_str().trim();
        if value.is_empty() || self.is_rejected_at(text, found.start()) {
            return None;
        }

        match self.kind {
            ValueKind::Text => Some(value.to_string()),
            ValueKind::Date => parse_date(value).map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !ISO_DATE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
