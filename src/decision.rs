use serde::Deserialize;

use crate::models::{ClassificationResult, Decision};

/// Binary decision on top of an N-way classifier: only the presence of the
/// keyword in the top label matters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecisionRule {
    /// Case-sensitive substring searched for in the top label
    pub keyword: String,
    pub positive_label: String,
    pub negative_label: String,

    /// Optional gate: a keyword match below this confidence counts as negative.
    /// None keeps the plain keyword test.
    pub min_confidence: Option<f32>,
}

impl Default for DecisionRule {
    fn default() -> Self {
        Self {
            keyword: "hotdog".to_string(),
            positive_label: "Hotdog!".to_string(),
            negative_label: "Not hotdog!".to_string(),
            min_confidence: None,
        }
    }
}

impl DecisionRule {
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: Option<f32>) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Decide on the first entry of the result
    pub fn decide(&self, result: &ClassificationResult) -> Decision {
        let top = result.top();
        let matches = top.label.contains(&self.keyword);
        let confident = self
            .min_confidence
            .is_none_or(|threshold| top.confidence >= threshold);
        let positive = matches && confident;

        let label = if positive {
            self.positive_label.clone()
        } else {
            self.negative_label.clone()
        };

        Decision {
            label,
            positive,
            basis: top.clone(),
        }
    }
}
