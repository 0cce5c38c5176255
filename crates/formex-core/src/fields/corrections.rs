//! Literal fixes for systematic OCR misreads, applied before parsing.

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

use super::patterns::CARRIAGE_RETURN;

/// One find/replace pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub wrong: String,
    pub right: String,
}

impl Correction {
    pub fn new(wrong: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            wrong: wrong.into(),
            right: right.into(),
        }
    }
}

/// Ordered list of corrections. Each one sees the output of the previous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextCorrections {
    corrections: Vec<Correction>,
}

impl TextCorrections {
    pub fn new(corrections: Vec<Correction>) -> Result<Self, RuleError> {
        if let Some(i) = corrections.iter().position(|c| c.wrong.is_empty()) {
            return Err(RuleError::EmptyCorrection(i));
        }
        Ok(Self { corrections })
    }

    /// Misreads seen on Korean enrollment forms.
    pub fn korean_defaults() -> Vec<Correction> {
        vec![
            Correction::new("똑똑케어", "펫케어"),
            Correction::new("WIFI (무료WIFI)가", "WIFI (무료WIFI)기가"),
            Correction::new("기기인터넷", "기가인터넷"),
            Correction::new("욜정", "요금제"),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Normalize line endings and apply every correction in order.
    pub fn apply(&self, text: &str) -> String {
        let mut text = CARRIAGE_RETURN.replace_all(text, "\n").into_owned();
        for correction in &self.corrections {
            if text.contains(&correction.wrong) {
                text = text.replace(&correction.wrong, &correction.right);
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_defaults() {
        let corrections = TextCorrections::new(TextCorrections::korean_defaults()).unwrap();
        assert_eq!(
            corrections.apply("욜정: 기기인터넷 슬림\r\n부가: 똑똑케어"),
            "요금제: 기가인터넷 슬림\n부가: 펫케어"
        );
    }

    #[test]
    fn test_corrections_chain_in_order() {
        let corrections = TextCorrections::new(vec![
            Correction::new("a", "b"),
            Correction::new("b", "c"),
        ])
        .unwrap();
        assert_eq!(corrections.apply("a"), "c");
    }

    #[test]
    fn test_empty_search_rejected() {
        let result = TextCorrections::new(vec![Correction::new("x", "y"), Correction::new("", "z")]);
        assert!(matches!(result, Err(RuleError::EmptyCorrection(1))));
    }
}
