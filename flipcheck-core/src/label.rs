//! Sentiment label vocabulary and classifier label normalization.

use crate::error::FlipcheckError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sentiment label as stored in the table.
///
/// Classifier tokens outside the known vocabulary are kept as `Other` (lower-cased)
/// rather than rejected, so a new model's label scheme shows up in the data instead
/// of aborting a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    Positive,
    Negative,
    Other(String),
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Other(s) => s,
        }
    }

    /// Whether this is one of the two canonical sentiment labels.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Parse a gold label from a corpus cell: `0`/`1` or `negative`/`positive`.
    pub fn from_gold(raw: &str) -> Result<Self, FlipcheckError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "negative" | "neg" => Ok(Self::Negative),
            "1" | "positive" | "pos" => Ok(Self::Positive),
            other => Err(FlipcheckError::corpus(format!(
                "unrecognized gold label '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        match s.as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Other(s),
        }
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        match label {
            Label::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Classifier tokens with a fixed meaning, matched after upper-casing.
static LABEL_MAP: &[(&str, Label)] = &[
    ("LABEL_0", Label::Negative),
    ("LABEL_1", Label::Positive),
    ("NEGATIVE", Label::Negative),
    ("POSITIVE", Label::Positive),
];

/// Map a raw classifier label token onto the table vocabulary.
///
/// Total: every input maps to something. Unknown tokens pass through lower-cased.
pub fn normalize_label(raw: &str) -> Label {
    let upper = raw.trim().to_uppercase();
    LABEL_MAP
        .iter()
        .find(|(token, _)| *token == upper)
        .map(|(_, label)| label.clone())
        .unwrap_or_else(|| {
            tracing::warn!(token = raw, "Unrecognized classifier label, passing through");
            Label::Other(raw.to_lowercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_tokens() {
        assert_eq!(normalize_label("LABEL_1"), Label::Positive);
        assert_eq!(normalize_label("LABEL_0"), Label::Negative);
        assert_eq!(normalize_label("NEGATIVE"), Label::Negative);
        assert_eq!(normalize_label("Positive"), Label::Positive);
        assert_eq!(normalize_label("label_1"), Label::Positive);
    }

    #[test]
    fn test_normalize_unknown_passes_through_lowercased() {
        assert_eq!(normalize_label("FOO"), Label::Other("foo".into()));
        assert_eq!(normalize_label("Neutral"), Label::Other("neutral".into()));
    }

    #[test]
    fn test_from_gold() {
        assert_eq!(Label::from_gold("1").unwrap(), Label::Positive);
        assert_eq!(Label::from_gold("0").unwrap(), Label::Negative);
        assert_eq!(Label::from_gold(" Negative ").unwrap(), Label::Negative);
        assert!(Label::from_gold("2").is_err());
    }

    #[test]
    fn test_label_serde_as_plain_string() {
        let json = serde_json::to_string(&Label::Positive).unwrap();
        assert_eq!(json, "\"positive\"");
        let parsed: Label = serde_json::from_str("\"foo\"").unwrap();
        assert_eq!(parsed, Label::Other("foo".into()));
    }
}
