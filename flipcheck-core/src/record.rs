//! Row types of the shared table.

use crate::label::Label;
use serde::{Deserialize, Serialize};

/// `variant_id` of the unperturbed row in each group.
pub const BASE_VARIANT: &str = "base";

/// Variant tag for the 1-based variant index (`v1`, `v2`, ...).
pub fn variant_tag(index: usize) -> String {
    format!("v{index}")
}

/// One scored row of the table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub variant_id: String,
    pub text: String,
    pub true_label: Label,
    pub pred_label: Label,
    pub confidence: f64,
}

impl Record {
    pub fn is_base(&self) -> bool {
        self.variant_id == BASE_VARIANT
    }

    pub fn is_correct(&self) -> bool {
        self.pred_label == self.true_label
    }

    pub fn is_error(&self) -> bool {
        !self.is_correct()
    }
}

/// A base item drawn from the labeled corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub label: Label,
}

/// A row waiting for its prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRow {
    pub id: String,
    pub variant_id: String,
    pub text: String,
    pub true_label: Label,
}

impl PendingRow {
    /// Attach a prediction, producing a complete record.
    pub fn score(self, pred_label: Label, confidence: f64) -> Record {
        Record {
            id: self.id,
            variant_id: self.variant_id,
            text: self.text,
            true_label: self.true_label,
            pred_label,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_row_score() {
        let row = PendingRow {
            id: "sst2_0000".into(),
            variant_id: BASE_VARIANT.into(),
            text: "a gripping film".into(),
            true_label: Label::Positive,
        };
        let record = row.score(Label::Negative, 0.75);
        assert!(record.is_base());
        assert!(record.is_error());
        assert_eq!(record.confidence, 0.75);
    }

    #[test]
    fn test_variant_tag() {
        assert_eq!(variant_tag(1), "v1");
        assert_eq!(variant_tag(12), "v12");
    }
}
