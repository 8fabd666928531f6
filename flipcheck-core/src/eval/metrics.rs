//! Consistency, accuracy, and confidence-discrimination statistics over a table.

use crate::data::table::Table;
use crate::label::Label;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many base items flipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlipStats {
    /// Ids whose rows carry more than one distinct `pred_label`.
    pub flipped: usize,
    pub total_ids: usize,
}

impl FlipStats {
    /// Flip rate in percent; 0 for an empty table.
    pub fn percent(&self) -> f64 {
        percent(self.flipped, self.total_ids)
    }
}

/// Count the ids whose rows (base included) received more than one distinct prediction.
pub fn flip_stats(table: &Table) -> FlipStats {
    let groups = table.groups();
    let flipped = groups
        .iter()
        .filter(|(_, rows)| {
            rows.iter()
                .map(|r| &r.pred_label)
                .collect::<HashSet<&Label>>()
                .len()
                > 1
        })
        .count();
    FlipStats {
        flipped,
        total_ids: groups.len(),
    }
}

/// Correct predictions over a set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub correct: usize,
    pub total: usize,
}

impl AccuracyStats {
    /// Accuracy in percent; 0 for no rows.
    pub fn percent(&self) -> f64 {
        percent(self.correct, self.total)
    }

    pub fn errors(&self) -> usize {
        self.total - self.correct
    }
}

pub fn accuracy<'a>(records: impl IntoIterator<Item = &'a Record>) -> AccuracyStats {
    let (correct, total) = records
        .into_iter()
        .fold((0, 0), |(c, t), r| (c + usize::from(r.is_correct()), t + 1));
    AccuracyStats { correct, total }
}

/// Mean confidence of correct rows and of error rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSplit {
    pub correct_count: usize,
    pub error_count: usize,
    pub mean_correct: Option<f64>,
    pub mean_error: Option<f64>,
}

impl ConfidenceSplit {
    /// `mean_correct - mean_error`, when both groups are non-empty.
    pub fn gap(&self) -> Option<f64> {
        Some(self.mean_correct? - self.mean_error?)
    }
}

pub fn confidence_split<'a>(records: impl IntoIterator<Item = &'a Record>) -> ConfidenceSplit {
    let (correct, errors): (Vec<&Record>, Vec<&Record>) =
        records.into_iter().partition(|r| r.is_correct());
    ConfidenceSplit {
        correct_count: correct.len(),
        error_count: errors.len(),
        mean_correct: mean(correct.iter().map(|r| r.confidence)),
        mean_error: mean(errors.iter().map(|r| r.confidence)),
    }
}

/// ROC AUC of `scores` against binary `positives`.
///
/// Computed as the Mann-Whitney U statistic with average ranks for tied scores, which
/// equals the area under the empirical ROC curve. `None` when either class is absent.
pub fn roc_auc(positives: &[bool], scores: &[f64]) -> Option<f64> {
    if positives.len() != scores.len() {
        return None;
    }
    let n_pos = positives.iter().filter(|&&p| p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the average rank.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if positives[idx] {
                pos_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// AUC of confidence as a predictor of correctness.
pub fn confidence_auc<'a>(records: impl IntoIterator<Item = &'a Record>) -> Option<f64> {
    let (correct, scores): (Vec<bool>, Vec<f64>) = records
        .into_iter()
        .map(|r| (r.is_correct(), r.confidence))
        .unzip();
    roc_auc(&correct, &scores)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, variant: &str, truth: Label, pred: Label, conf: f64) -> Record {
        Record {
            id: id.into(),
            variant_id: variant.into(),
            text: String::new(),
            true_label: truth,
            pred_label: pred,
            confidence: conf,
        }
    }

    #[test]
    fn test_flip_rate_half() {
        let table = Table::new(vec![
            row("a", "base", Label::Positive, Label::Positive, 0.9),
            row("a", "v1", Label::Positive, Label::Positive, 0.8),
            row("b", "base", Label::Positive, Label::Positive, 0.9),
            row("b", "v1", Label::Positive, Label::Negative, 0.6),
        ]);
        let stats = flip_stats(&table);
        assert_eq!(stats.flipped, 1);
        assert_eq!(stats.total_ids, 2);
        assert_eq!(stats.percent(), 50.0);
    }

    #[test]
    fn test_flip_rate_empty_table() {
        assert_eq!(flip_stats(&Table::default()).percent(), 0.0);
    }

    #[test]
    fn test_accuracy_nine_of_ten() {
        let rows: Vec<Record> = (0..10)
            .map(|i| {
                let pred = if i == 0 { Label::Negative } else { Label::Positive };
                row(&format!("id{i}"), "base", Label::Positive, pred, 0.9)
            })
            .collect();
        let stats = accuracy(&rows);
        assert_eq!(stats.correct, 9);
        assert_eq!(stats.errors(), 1);
        assert!((stats.percent() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverse() {
        assert_eq!(roc_auc(&[false, false, true, true], &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&[true, true, false, false], &[0.1, 0.2, 0.8, 0.9]), Some(0.0));
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        assert_eq!(roc_auc(&[true, false], &[0.5, 0.5]), Some(0.5));
        // pos {0.9, 0.5}, neg {0.5, 0.1}: pairs (0.9>0.5) (0.9>0.1) (0.5=0.5) (0.5>0.1) -> 3.5/4
        assert_eq!(
            roc_auc(&[true, true, false, false], &[0.9, 0.5, 0.5, 0.1]),
            Some(0.875)
        );
    }

    #[test]
    fn test_roc_auc_single_class_is_none() {
        assert_eq!(roc_auc(&[true, true], &[0.1, 0.9]), None);
        assert_eq!(roc_auc(&[], &[]), None);
        assert_eq!(roc_auc(&[true], &[0.1, 0.2]), None);
    }

    #[test]
    fn test_confidence_split_and_gap() {
        let rows = vec![
            row("a", "base", Label::Positive, Label::Positive, 0.9),
            row("b", "base", Label::Positive, Label::Positive, 0.7),
            row("c", "base", Label::Positive, Label::Negative, 0.6),
        ];
        let split = confidence_split(&rows);
        assert_eq!(split.correct_count, 2);
        assert_eq!(split.error_count, 1);
        assert!((split.mean_correct.unwrap() - 0.8).abs() < 1e-9);
        assert!((split.gap().unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(confidence_auc(&rows), Some(1.0));
    }

    #[test]
    fn test_gap_undefined_without_errors() {
        let rows = vec![row("a", "base", Label::Positive, Label::Positive, 0.9)];
        assert_eq!(confidence_split(&rows).gap(), None);
    }
}
