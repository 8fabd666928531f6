//! Property-based tests for table I/O, flip rate, fallback, and label normalization.

use async_trait::async_trait;
use chrono::Utc;
use flipcheck_core::data::corpus::{CorpusInfo, LabeledCorpus};
use flipcheck_core::data::table::Table;
use flipcheck_core::eval::metrics::flip_stats;
use flipcheck_core::inference::{Classifier, RawPrediction};
use flipcheck_core::perturb::{PerturbOutcome, fallback, resolve};
use flipcheck_core::record::LabeledText;
use flipcheck_core::{
    DatasetBuilder, FlipcheckConfig, FlipcheckError, Label, Record, normalize_label,
};
use proptest::prelude::*;

fn label() -> impl Strategy<Value = Label> {
    prop_oneof![
        Just(Label::Positive),
        Just(Label::Negative),
        "x[a-z]{0,6}".prop_map(Label::Other),
    ]
}

fn record() -> impl Strategy<Value = Record> {
    (
        "[a-z0-9_]{1,8}",
        "(base|v[0-9]{1,2})",
        "[ -~]{0,40}",
        prop_oneof![Just(Label::Positive), Just(Label::Negative)],
        label(),
        0.0f64..=1.0,
    )
        .prop_map(|(id, variant_id, text, true_label, pred_label, confidence)| Record {
            id,
            variant_id,
            text,
            true_label,
            pred_label,
            confidence,
        })
}

// --- Table properties ---

proptest! {
    #[test]
    fn table_write_read_round_trips(records in prop::collection::vec(record(), 0..20)) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let table = Table::new(records);
        table.write(&path).unwrap();
        prop_assert_eq!(Table::read(&path).unwrap(), table);
    }

    #[test]
    fn flip_rate_is_idempotent_and_order_independent(
        rows in prop::collection::vec((0usize..6, any::<bool>()), 1..40),
    ) {
        let records: Vec<Record> = rows
            .iter()
            .enumerate()
            .map(|(i, &(id, positive))| Record {
                id: format!("id{id}"),
                variant_id: format!("v{i}"),
                text: String::new(),
                true_label: Label::Positive,
                pred_label: if positive { Label::Positive } else { Label::Negative },
                confidence: 0.5,
            })
            .collect();
        let table = Table::new(records.clone());
        let first = flip_stats(&table);
        prop_assert_eq!(first, flip_stats(&table));

        let reversed = Table::new(records.into_iter().rev().collect());
        prop_assert_eq!(first, flip_stats(&reversed));
        prop_assert!(first.flipped <= first.total_ids);
        prop_assert!((0.0..=100.0).contains(&first.percent()));
    }
}

// --- Fallback properties ---

proptest! {
    #[test]
    fn fallback_always_changes_text(text in "[a-z ]{0,30}") {
        let out = fallback(&text);
        prop_assert_ne!(&out, &text);
        if text.contains("the") {
            prop_assert_eq!(out.len(), text.len());
            prop_assert!(out.contains("teh"));
        } else {
            prop_assert_eq!(out, format!("{text}."));
        }
    }

    #[test]
    fn resolve_keeps_successful_perturbations(text in "[a-z ]{0,30}", perturbed in "[a-z]{1,10}") {
        prop_assert_eq!(
            resolve(PerturbOutcome::Perturbed(perturbed.clone()), &text),
            perturbed
        );
        prop_assert_eq!(
            resolve(PerturbOutcome::Failed { reason: "boom".into() }, &text),
            fallback(&text)
        );
    }
}

// --- Label normalization properties ---

proptest! {
    #[test]
    fn normalize_label_is_total(raw in "[A-Za-z0-9_]{0,12}") {
        let label = normalize_label(&raw);
        match raw.to_uppercase().as_str() {
            "LABEL_1" | "POSITIVE" => prop_assert_eq!(label, Label::Positive),
            "LABEL_0" | "NEGATIVE" => prop_assert_eq!(label, Label::Negative),
            _ => prop_assert_eq!(label, Label::Other(raw.to_lowercase())),
        }
    }
}

// --- Builder invariants ---

struct SeqCorpus(usize);

#[async_trait]
impl LabeledCorpus for SeqCorpus {
    async fn load(&self) -> Result<Vec<LabeledText>, FlipcheckError> {
        Ok((0..self.0)
            .map(|i| LabeledText {
                text: format!("the plot of film {i} is good"),
                label: if i % 3 == 0 { Label::Negative } else { Label::Positive },
            })
            .collect())
    }

    fn source_info(&self) -> CorpusInfo {
        CorpusInfo {
            source_type: "memory".into(),
            location: "sequence".into(),
            accessed_at: Utc::now(),
        }
    }
}

struct LengthClassifier;

#[async_trait]
impl Classifier for LengthClassifier {
    fn name(&self) -> &str {
        "length"
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>, FlipcheckError> {
        Ok(texts
            .iter()
            .map(|t| RawPrediction {
                label: if t.len() % 2 == 0 { "POSITIVE" } else { "NEGATIVE" }.into(),
                score: (t.len() % 100) as f64 / 100.0,
            })
            .collect())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn built_tables_satisfy_row_invariants(
        seed in any::<u64>(),
        samples in 1usize..8,
        variants in 0usize..4,
    ) {
        let mut config = FlipcheckConfig::default();
        config.build.seed = seed;
        config.build.sample_size = samples;
        config.build.variants_per_sample = variants;
        config.classifier.batch_size = 3;

        let builder =
            DatasetBuilder::new(config, Box::new(SeqCorpus(10)), Box::new(LengthClassifier));
        let (table, summary) = tokio_test::block_on(builder.build()).unwrap();

        prop_assert_eq!(table.len(), samples * (variants + 1));
        prop_assert_eq!(summary.rows_per_base, variants + 1);
        prop_assert!(table.check_integrity().is_empty());
    }
}
