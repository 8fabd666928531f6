//! Independent validation of a built table.

use super::metrics::{
    AccuracyStats, ConfidenceSplit, FlipStats, accuracy, confidence_auc, confidence_split,
    flip_stats,
};
use crate::config::{ConfidenceMetric, ValidateConfig};
use crate::data::table::{IntegrityIssue, Table};
use crate::error::FlipcheckError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Metrics that need an analysis stage this table alone cannot support.
pub const UNAVAILABLE_METRICS: &[&str] = &[
    "Structural Retention Index (SRI)",
    "Collapse Index (CI)",
    "CSI failure mode classification (Type I-V)",
    "SRI letter grading (A-F)",
    "AUC/ROC curves for CI and SRI",
];

/// A computed figure compared against its expected value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectationCheck {
    pub actual: f64,
    pub expected: f64,
    pub tolerance: f64,
}

impl ExpectationCheck {
    pub fn new(actual: f64, expected: f64, tolerance: f64) -> Self {
        Self {
            actual,
            expected,
            tolerance,
        }
    }

    /// Strictly within tolerance of the expected value.
    pub fn passed(&self) -> bool {
        (self.actual - self.expected).abs() < self.tolerance
    }
}

/// Confidence discrimination figures, per report mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ConfidenceReport {
    /// AUC over base rows, with the base-row confidence split.
    Auc {
        auc: Option<f64>,
        split: ConfidenceSplit,
    },
    /// Mean confidence gap over all rows.
    MeanGap { split: ConfidenceSplit },
}

impl ConfidenceReport {
    pub fn metric(&self) -> ConfidenceMetric {
        match self {
            Self::Auc { .. } => ConfidenceMetric::Auc,
            Self::MeanGap { .. } => ConfidenceMetric::MeanGap,
        }
    }
}

/// Everything the validator computed for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_path: Option<PathBuf>,
    pub total_rows: usize,
    pub unique_ids: usize,
    pub rows_per_base: usize,
    pub flips: FlipStats,
    pub flip_check: ExpectationCheck,
    pub base_accuracy: AccuracyStats,
    pub overall_accuracy: AccuracyStats,
    pub base_accuracy_check: ExpectationCheck,
    pub confidence: ConfidenceReport,
    pub integrity_issues: Vec<IntegrityIssue>,
    pub unavailable_metrics: Vec<String>,
}

impl ValidationReport {
    /// Base accuracy minus overall accuracy, in percentage points.
    pub fn degradation(&self) -> f64 {
        self.base_accuracy.percent() - self.overall_accuracy.percent()
    }
}

/// Recomputes the table's statistics without trusting anything the builder reported.
pub struct MetricsValidator {
    config: ValidateConfig,
}

impl MetricsValidator {
    pub fn new(config: ValidateConfig) -> Self {
        Self { config }
    }

    /// Read the table at `path` and validate it.
    pub fn validate_path(&self, path: &Path) -> Result<ValidationReport, FlipcheckError> {
        info!(path = %path.display(), "Loading table");
        let table = Table::read(path)?;
        let mut report = self.validate(&table)?;
        report.table_path = Some(path.to_path_buf());
        Ok(report)
    }

    pub fn validate(&self, table: &Table) -> Result<ValidationReport, FlipcheckError> {
        if table.is_empty() {
            return Err(FlipcheckError::evaluation("table has no rows"));
        }
        let base_accuracy = accuracy(table.base_records());
        if base_accuracy.total == 0 {
            return Err(FlipcheckError::evaluation("table has no base rows"));
        }

        let integrity_issues = table.check_integrity();
        for issue in &integrity_issues {
            warn!(%issue, "Table integrity issue");
        }

        let unique_ids = table.unique_ids();
        let flips = flip_stats(table);
        let overall_accuracy = accuracy(table.records());

        let confidence = match self.config.metric {
            ConfidenceMetric::Auc => ConfidenceReport::Auc {
                auc: confidence_auc(table.base_records()),
                split: confidence_split(table.base_records()),
            },
            ConfidenceMetric::MeanGap => ConfidenceReport::MeanGap {
                split: confidence_split(table.records()),
            },
        };

        Ok(ValidationReport {
            table_path: None,
            total_rows: table.len(),
            unique_ids,
            rows_per_base: table.len() / unique_ids,
            flips,
            flip_check: ExpectationCheck::new(
                flips.percent(),
                self.config.expected_flip_rate,
                self.config.flip_rate_tolerance,
            ),
            base_accuracy,
            overall_accuracy,
            base_accuracy_check: ExpectationCheck::new(
                base_accuracy.percent(),
                self.config.expected_base_accuracy,
                self.config.base_accuracy_tolerance,
            ),
            confidence,
            integrity_issues,
            unavailable_metrics: UNAVAILABLE_METRICS.iter().map(|m| m.to_string()).collect(),
        })
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn mark(passed: bool) -> &'static str {
    if passed { "PASS" } else { "FAIL" }
}

const RULE: &str = "============================================================";

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "DATASET INDEPENDENT VALIDATION")?;
        writeln!(f, "{RULE}")?;
        if let Some(path) = &self.table_path {
            writeln!(f, "Table: {}", path.display())?;
        }
        writeln!(f, "\nDataset Stats:")?;
        writeln!(f, "  Total rows: {}", self.total_rows)?;
        writeln!(f, "  Unique base examples: {}", self.unique_ids)?;
        writeln!(f, "  Variants per base: {}", self.rows_per_base)?;

        if !self.integrity_issues.is_empty() {
            writeln!(f, "\nIntegrity issues ({}):", self.integrity_issues.len())?;
            for issue in &self.integrity_issues {
                writeln!(f, "  - {issue}")?;
            }
        }

        writeln!(f, "\n{RULE}\nFLIP RATE\n{RULE}")?;
        writeln!(
            f,
            "Base examples with flips: {}/{}",
            self.flips.flipped, self.flips.total_ids
        )?;
        writeln!(f, "Flip rate: {:.1}%", self.flips.percent())?;
        writeln!(
            f,
            "[{}] within {:.1} of expected {:.1}%",
            mark(self.flip_check.passed()),
            self.flip_check.tolerance,
            self.flip_check.expected
        )?;

        writeln!(f, "\n{RULE}\nACCURACY\n{RULE}")?;
        writeln!(
            f,
            "Base examples (clean): {:.1}% ({}/{})",
            self.base_accuracy.percent(),
            self.base_accuracy.correct,
            self.base_accuracy.total
        )?;
        writeln!(
            f,
            "All variants (with perturbations): {:.1}% ({}/{})",
            self.overall_accuracy.percent(),
            self.overall_accuracy.correct,
            self.overall_accuracy.total
        )?;
        writeln!(f, "Degradation: {:.1} percentage points", self.degradation())?;
        writeln!(
            f,
            "[{}] base accuracy within {:.1} of expected {:.1}%",
            mark(self.base_accuracy_check.passed()),
            self.base_accuracy_check.tolerance,
            self.base_accuracy_check.expected
        )?;

        writeln!(f, "\n{RULE}\nCONFIDENCE DISCRIMINATION\n{RULE}")?;
        match &self.confidence {
            ConfidenceReport::Auc { auc, split } => {
                writeln!(f, "Computed on base examples only")?;
                writeln!(
                    f,
                    "Errors: {} samples (mean conf: {})",
                    split.error_count,
                    opt(split.mean_error, 4)
                )?;
                writeln!(
                    f,
                    "Correct: {} samples (mean conf: {})",
                    split.correct_count,
                    opt(split.mean_correct, 4)
                )?;
                writeln!(f, "AUC(Conf): {}", opt(*auc, 3))?;
            }
            ConfidenceReport::MeanGap { split } => {
                writeln!(f, "Computed on all rows")?;
                writeln!(
                    f,
                    "Mean confidence (correct): {}",
                    opt(split.mean_correct, 4)
                )?;
                writeln!(f, "Mean confidence (errors): {}", opt(split.mean_error, 4))?;
                writeln!(f, "Confidence gap: {}", opt(split.gap(), 4))?;
            }
        }

        writeln!(f, "\n{RULE}\nNOT COMPUTABLE FROM THIS TABLE\n{RULE}")?;
        writeln!(f, "The following require an external analysis stage:")?;
        for metric in &self.unavailable_metrics {
            writeln!(f, "  - {metric}")?;
        }

        writeln!(f, "\n{RULE}\nSUMMARY\n{RULE}")?;
        writeln!(f, "Flip rate: {:.1}%", self.flips.percent())?;
        writeln!(f, "Base accuracy: {:.1}%", self.base_accuracy.percent())?;
        writeln!(f, "Overall accuracy: {:.1}%", self.overall_accuracy.percent())?;
        match &self.confidence {
            ConfidenceReport::Auc { auc, .. } => {
                writeln!(f, "AUC(Conf): {} (base only)", opt(*auc, 3))?;
            }
            ConfidenceReport::MeanGap { split } => {
                writeln!(f, "Confidence gap: {} (all rows)", opt(split.gap(), 4))?;
            }
        }
        writeln!(f, "Advanced metrics (CI, SRI, CSI) are not available here")?;
        write!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::record::Record;

    fn row(id: &str, variant: &str, pred: Label, conf: f64) -> Record {
        Record {
            id: id.into(),
            variant_id: variant.into(),
            text: "text".into(),
            true_label: Label::Positive,
            pred_label: pred,
            confidence: conf,
        }
    }

    fn table() -> Table {
        Table::new(vec![
            row("a", "base", Label::Positive, 0.95),
            row("a", "v1", Label::Positive, 0.90),
            row("b", "base", Label::Positive, 0.80),
            row("b", "v1", Label::Negative, 0.55),
        ])
    }

    fn config(metric: ConfidenceMetric) -> ValidateConfig {
        ValidateConfig {
            metric,
            expected_flip_rate: 50.0,
            ..ValidateConfig::default()
        }
    }

    #[test]
    fn test_validate_auc_mode() {
        let report = MetricsValidator::new(config(ConfidenceMetric::Auc))
            .validate(&table())
            .unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.unique_ids, 2);
        assert_eq!(report.rows_per_base, 2);
        assert_eq!(report.flips.percent(), 50.0);
        assert!(report.flip_check.passed());
        assert_eq!(report.base_accuracy.percent(), 100.0);
        assert_eq!(report.overall_accuracy.percent(), 75.0);
        assert_eq!(report.degradation(), 25.0);
        // Every base row is correct, so AUC is undefined.
        assert!(matches!(
            report.confidence,
            ConfidenceReport::Auc { auc: None, .. }
        ));
        assert!(report.integrity_issues.is_empty());
        assert_eq!(report.unavailable_metrics.len(), UNAVAILABLE_METRICS.len());
    }

    #[test]
    fn test_validate_mean_gap_mode() {
        let report = MetricsValidator::new(config(ConfidenceMetric::MeanGap))
            .validate(&table())
            .unwrap();
        let ConfidenceReport::MeanGap { split } = report.confidence else {
            panic!("expected mean-gap report");
        };
        assert_eq!(split.error_count, 1);
        let gap = split.gap().unwrap();
        assert!((gap - (0.8833333333333333 - 0.55)).abs() < 1e-9);
    }

    #[test]
    fn test_base_accuracy_check_fails_outside_tolerance() {
        let report = MetricsValidator::new(ValidateConfig::default())
            .validate(&table())
            .unwrap();
        // 100% vs expected 90% with tolerance 2.
        assert!(!report.base_accuracy_check.passed());
    }

    #[test]
    fn test_validate_rejects_empty_table() {
        let err = MetricsValidator::new(ValidateConfig::default())
            .validate(&Table::default())
            .unwrap_err();
        assert!(matches!(err, FlipcheckError::Evaluation(_)));
    }

    #[test]
    fn test_validate_rejects_table_without_base_rows() {
        let table = Table::new(vec![row("a", "v1", Label::Positive, 0.9)]);
        assert!(
            MetricsValidator::new(ValidateConfig::default())
                .validate(&table)
                .is_err()
        );
    }

    #[test]
    fn test_report_display_lists_unavailable_metrics() {
        let report = MetricsValidator::new(ValidateConfig::default())
            .validate(&table())
            .unwrap();
        let text = report.to_string();
        assert!(text.contains("Flip rate: 50.0%"));
        assert!(text.contains("Overall accuracy: 75.0%"));
        assert!(text.contains("Collapse Index (CI)"));
        assert!(text.contains("AUC(Conf): n/a"));
    }

    #[test]
    fn test_report_serializes_with_mode_tag() {
        let report = MetricsValidator::new(config(ConfidenceMetric::MeanGap))
            .validate(&table())
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["confidence"]["mode"], "mean-gap");
        assert_eq!(json["flips"]["flipped"], 1);
    }
}
