//! End-to-end tests: build a table with in-memory collaborators, write it, validate it.

use async_trait::async_trait;
use chrono::Utc;
use flipcheck_core::config::{ConfidenceMetric, CorpusSource, FlipcheckConfig};
use flipcheck_core::data::corpus::{CorpusInfo, LabeledCorpus, corpus_from_config};
use flipcheck_core::data::table::{Table, hash_file};
use flipcheck_core::eval::{ConfidenceReport, MetricsValidator};
use flipcheck_core::inference::{Classifier, RawPrediction};
use flipcheck_core::record::LabeledText;
use flipcheck_core::{DatasetBuilder, FlipcheckError, Label};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct MemoryCorpus(Vec<LabeledText>);

#[async_trait]
impl LabeledCorpus for MemoryCorpus {
    async fn load(&self) -> Result<Vec<LabeledText>, FlipcheckError> {
        Ok(self.0.clone())
    }

    fn source_info(&self) -> CorpusInfo {
        CorpusInfo {
            source_type: "memory".into(),
            location: "reviews".into(),
            accessed_at: Utc::now(),
        }
    }
}

/// Recognizes the exact words "good" and "bad"; anything it cannot read is a low
/// confidence negative, so typos in those words tend to flip positive items.
struct LexiconClassifier;

#[async_trait]
impl Classifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>, FlipcheckError> {
        Ok(texts
            .iter()
            .map(|t| {
                let words: Vec<&str> = t.split_whitespace().collect();
                let (label, score) = if words.contains(&"good") {
                    ("LABEL_1", 0.95)
                } else if words.contains(&"bad") {
                    ("LABEL_0", 0.9)
                } else {
                    ("LABEL_0", 0.55)
                };
                RawPrediction {
                    label: label.into(),
                    score,
                }
            })
            .collect())
    }
}

fn reviews() -> MemoryCorpus {
    MemoryCorpus(
        (0..30)
            .map(|i| {
                if i % 2 == 0 {
                    LabeledText {
                        text: format!("review {i} says the movie is good"),
                        label: Label::Positive,
                    }
                } else {
                    LabeledText {
                        text: format!("review {i} says the movie is bad"),
                        label: Label::Negative,
                    }
                }
            })
            .collect(),
    )
}

fn config(dir: &TempDir) -> FlipcheckConfig {
    let mut config = FlipcheckConfig::default();
    config.data.table_path = dir.path().join("checklist").join("demo.csv");
    config.build.sample_size = 12;
    config.build.variants_per_sample = 3;
    config.classifier.batch_size = 5;
    config
}

#[tokio::test]
async fn test_build_then_validate_agree() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let builder = DatasetBuilder::new(
        config.clone(),
        Box::new(reviews()),
        Box::new(LexiconClassifier),
    );

    let summary = builder.run().await.unwrap();
    let path = summary.output.clone().unwrap();
    assert_eq!(path, config.data.table_path);
    assert_eq!(summary.total_rows, 48);
    assert_eq!(summary.rows_per_base, 4);
    assert_eq!(summary.sha256.as_deref(), Some(hash_file(&path).unwrap().as_str()));

    let report = MetricsValidator::new(config.validate.clone())
        .validate_path(&path)
        .unwrap();
    assert_eq!(report.total_rows, summary.total_rows);
    assert_eq!(report.unique_ids, summary.base_count);
    assert_eq!(report.rows_per_base, summary.rows_per_base);
    assert_eq!(report.flips, summary.flips);
    assert_eq!(report.overall_accuracy, summary.accuracy);
    assert!(report.integrity_issues.is_empty());

    // Every unperturbed review contains its sentiment word verbatim.
    assert_eq!(report.base_accuracy.percent(), 100.0);
    assert!(matches!(
        report.confidence,
        ConfidenceReport::Auc { auc: None, .. }
    ));
}

#[tokio::test]
async fn test_table_keeps_row_invariants() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let builder = DatasetBuilder::new(
        config.clone(),
        Box::new(reviews()),
        Box::new(LexiconClassifier),
    );
    builder.run().await.unwrap();

    let table = Table::read(&config.data.table_path).unwrap();
    for (id, rows) in table.groups() {
        let bases = rows.iter().filter(|r| r.is_base()).count();
        assert_eq!(bases, 1, "id {id}");
        assert!(rows.iter().all(|r| r.true_label == rows[0].true_label));
        let variants: Vec<&str> = rows.iter().map(|r| r.variant_id.as_str()).collect();
        assert_eq!(variants, vec!["base", "v1", "v2", "v3"]);
    }
    assert!(
        table
            .records()
            .iter()
            .all(|r| r.pred_label.is_known() && (0.0..=1.0).contains(&r.confidence))
    );
}

#[tokio::test]
async fn test_rebuild_overwrites_with_identical_table() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let first = DatasetBuilder::new(
        config.clone(),
        Box::new(reviews()),
        Box::new(LexiconClassifier),
    )
    .run()
    .await
    .unwrap();
    let second = DatasetBuilder::new(
        config.clone(),
        Box::new(reviews()),
        Box::new(LexiconClassifier),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(first.sha256, second.sha256);
    assert_eq!(Table::read(&config.data.table_path).unwrap().len(), 48);
}

#[tokio::test]
async fn test_mean_gap_report_over_all_rows() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.validate.metric = ConfidenceMetric::MeanGap;
    DatasetBuilder::new(
        config.clone(),
        Box::new(reviews()),
        Box::new(LexiconClassifier),
    )
    .run()
    .await
    .unwrap();

    let report = MetricsValidator::new(config.validate.clone())
        .validate_path(&config.data.table_path)
        .unwrap();
    let ConfidenceReport::MeanGap { split } = &report.confidence else {
        panic!("expected mean-gap report");
    };
    assert_eq!(split.correct_count + split.error_count, report.total_rows);
    assert_eq!(split.error_count, report.overall_accuracy.errors());
}

#[tokio::test]
async fn test_csv_corpus_feeds_builder() {
    let dir = TempDir::new().unwrap();
    let corpus_path = dir.path().join("corpus.csv");
    std::fs::write(
        &corpus_path,
        "sentence,label\n\
         a good film,1\n\
         a bad film,0\n\
         good acting throughout,1\n\
         bad pacing and a weak story,0\n",
    )
    .unwrap();

    let mut config = config(&dir);
    config.corpus.source = CorpusSource::Csv;
    config.corpus.csv_path = Some(corpus_path);
    config.build.sample_size = 4;

    let corpus = corpus_from_config(&config.corpus).unwrap();
    let builder = DatasetBuilder::new(config, corpus, Box::new(LexiconClassifier));
    let (table, summary) = builder.build().await.unwrap();

    assert_eq!(summary.corpus.source_type, "csv");
    assert_eq!(table.len(), 16);
    assert_eq!(
        table.base_records().filter(|r| r.true_label == Label::Positive).count(),
        2
    );
}

#[tokio::test]
async fn test_validate_missing_table_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = MetricsValidator::new(Default::default())
        .validate_path(&dir.path().join("absent.csv"))
        .unwrap_err();
    assert!(matches!(err, FlipcheckError::NotFound(_)));
}
