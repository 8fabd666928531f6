//! The shared CSV table: persistence, grouping, and integrity checks.

use crate::error::FlipcheckError;
use crate::label::Label;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Header row of the table.
pub const COLUMNS: [&str; 6] = [
    "id",
    "variant_id",
    "text",
    "true_label",
    "pred_label",
    "confidence",
];

/// An ordered set of scored records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows with `variant_id == "base"`.
    pub fn base_records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_base())
    }

    /// Rows grouped by `id`, groups in order of first appearance.
    pub fn groups(&self) -> Vec<(&str, Vec<&Record>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<&Record>)> = Vec::new();
        for record in &self.records {
            let slot = *index.entry(record.id.as_str()).or_insert_with(|| {
                groups.push((record.id.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record);
        }
        groups
    }

    /// Number of distinct ids.
    pub fn unique_ids(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Write the table as CSV with a header row, replacing any existing file.
    ///
    /// Writes to a `.tmp` sibling and renames, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), FlipcheckError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.records {
            writer.serialize(record)?;
        }
        if self.records.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| FlipcheckError::table(format!("failed to flush CSV: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a table written by [`Table::write`].
    pub fn read(path: &Path) -> Result<Self, FlipcheckError> {
        if !path.exists() {
            return Err(FlipcheckError::not_found(format!(
                "table {} does not exist",
                path.display()
            )));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .enumerate()
            .map(|(idx, row)| {
                row.map_err(|e| {
                    FlipcheckError::table(format!(
                        "{} row {}: {e}",
                        path.display(),
                        idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<Record>, _>>()?;
        Ok(Self { records })
    }

    /// Check the structural invariants of a built table.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for r in &self.records {
            if !seen.insert((r.id.as_str(), r.variant_id.as_str())) {
                issues.push(IntegrityIssue::DuplicateKey {
                    id: r.id.clone(),
                    variant_id: r.variant_id.clone(),
                });
            }
            if !(0.0..=1.0).contains(&r.confidence) {
                issues.push(IntegrityIssue::ConfidenceOutOfRange {
                    id: r.id.clone(),
                    variant_id: r.variant_id.clone(),
                    value: r.confidence,
                });
            }
            if !r.pred_label.is_known() {
                issues.push(IntegrityIssue::UnknownLabel {
                    id: r.id.clone(),
                    variant_id: r.variant_id.clone(),
                    label: r.pred_label.clone(),
                });
            }
        }

        for (id, rows) in self.groups() {
            let bases = rows.iter().filter(|r| r.is_base()).count();
            if bases != 1 {
                issues.push(IntegrityIssue::BaseCount {
                    id: id.to_string(),
                    count: bases,
                });
            }
            let labels: HashSet<&Label> = rows.iter().map(|r| &r.true_label).collect();
            if labels.len() > 1 {
                issues.push(IntegrityIssue::InconsistentTrueLabel { id: id.to_string() });
            }
        }

        issues
    }
}

/// A violated table invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// An id with zero or several `base` rows.
    BaseCount { id: String, count: usize },
    InconsistentTrueLabel { id: String },
    DuplicateKey { id: String, variant_id: String },
    ConfidenceOutOfRange { id: String, variant_id: String, value: f64 },
    UnknownLabel { id: String, variant_id: String, label: Label },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseCount { id, count } => {
                write!(f, "{id}: expected exactly one base row, found {count}")
            }
            Self::InconsistentTrueLabel { id } => {
                write!(f, "{id}: rows disagree on true_label")
            }
            Self::DuplicateKey { id, variant_id } => {
                write!(f, "{id}/{variant_id}: duplicate row")
            }
            Self::ConfidenceOutOfRange {
                id,
                variant_id,
                value,
            } => write!(f, "{id}/{variant_id}: confidence {value} outside [0, 1]"),
            Self::UnknownLabel {
                id,
                variant_id,
                label,
            } => write!(f, "{id}/{variant_id}: unrecognized pred_label '{label}'"),
        }
    }
}

/// Compute the SHA-256 hex digest of a file.
pub fn hash_file(path: &Path) -> Result<String, FlipcheckError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}
