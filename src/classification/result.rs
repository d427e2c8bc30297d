//! Ranked classification results

use serde::{Deserialize, Serialize};

/// Value reported when the input is too unlike any trained label
pub const UNDEFINED_LABEL_VALUE: &str = "undefined";

/// Coarse bucket for displaying a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 0.85 => ConfidenceLevel::High,
            c if c >= 0.5 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "✓",
            ConfidenceLevel::Medium => "~",
            ConfidenceLevel::Low => "?",
        }
    }
}

/// One candidate value of the classified label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub value: String,
    pub confidence: f64,
}

impl LabelValue {
    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }

    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }
}

/// Result of classifying one signal for one label name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label_name: String,
    /// Candidates in descending confidence order
    pub ranked: Vec<LabelValue>,
    /// Mean log density of the input under all label models together
    pub pooled_log_density: f64,
}

impl Classification {
    pub fn new(label_name: impl Into<String>, ranked: Vec<LabelValue>, pooled_log_density: f64) -> Self {
        Self {
            label_name: label_name.into(),
            ranked,
            pooled_log_density,
        }
    }

    /// Single "undefined" candidate
    pub fn undefined(label_name: impl Into<String>, confidence: f64, pooled_log_density: f64) -> Self {
        Self::new(
            label_name,
            vec![LabelValue::new(UNDEFINED_LABEL_VALUE, confidence)],
            pooled_log_density,
        )
    }

    pub fn top(&self) -> Option<&LabelValue> {
        self.ranked.first()
    }

    pub fn top_value(&self) -> Option<&str> {
        self.top().map(|lv| lv.value.as_str())
    }

    pub fn is_undefined(&self) -> bool {
        self.top_value() == Some(UNDEFINED_LABEL_VALUE)
    }

    pub fn confidence_of(&self, value: &str) -> Option<f64> {
        self.ranked.iter().find(|lv| lv.value == value).map(|lv| lv.confidence)
    }
}
