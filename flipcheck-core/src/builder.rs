//! Dataset builder: sample, perturb, classify, persist.

use crate::config::FlipcheckConfig;
use crate::data::corpus::{CorpusInfo, LabeledCorpus, corpus_from_config, draw_sample};
use crate::data::table::{Table, hash_file};
use crate::error::FlipcheckError;
use crate::eval::metrics::{AccuracyStats, FlipStats, accuracy, flip_stats};
use crate::inference::{Classifier, HttpClassifier, Prediction, classify_all};
use crate::perturb::VariantGenerator;
use crate::record::{BASE_VARIANT, LabeledText, PendingRow, Record, variant_tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// What a build produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub total_rows: usize,
    pub base_count: usize,
    pub rows_per_base: usize,
    pub accuracy: AccuracyStats,
    pub flips: FlipStats,
    /// Variants that used the fallback edit.
    pub fallbacks: usize,
    pub seed: u64,
    pub corpus: CorpusInfo,
    pub classifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset built")?;
        writeln!(
            f,
            "  Corpus: {} ({})",
            self.corpus.location, self.corpus.source_type
        )?;
        writeln!(f, "  Classifier: {}", self.classifier)?;
        writeln!(f, "  Seed: {}", self.seed)?;
        writeln!(f, "  Total rows: {}", self.total_rows)?;
        writeln!(f, "  Base examples: {}", self.base_count)?;
        writeln!(f, "  Rows per base: {}", self.rows_per_base)?;
        writeln!(f, "  Fallback variants: {}", self.fallbacks)?;
        writeln!(
            f,
            "  Accuracy (all rows): {:.1}% ({}/{})",
            self.accuracy.percent(),
            self.accuracy.correct,
            self.accuracy.total
        )?;
        write!(
            f,
            "  Flip rate: {:.1}% ({}/{})",
            self.flips.percent(),
            self.flips.flipped,
            self.flips.total_ids
        )?;
        if let Some(output) = &self.output {
            write!(f, "\n  Output: {}", output.display())?;
        }
        if let Some(sha) = &self.sha256 {
            write!(f, "\n  SHA-256: {sha}")?;
        }
        Ok(())
    }
}

/// Format the id of the base item at `index`.
pub fn base_id(prefix: &str, index: usize) -> String {
    format!("{prefix}_{index:04}")
}

/// Expand sampled items into pending rows, base first then `v1..vN`, in sample order.
///
/// Returns the rows and the number of variants that fell back.
pub fn assemble_rows(
    samples: &[LabeledText],
    generator: &VariantGenerator,
    id_prefix: &str,
) -> (Vec<PendingRow>, usize) {
    let mut rows = Vec::with_capacity(samples.len() * (generator.variants_per_sample() + 1));
    let mut fallbacks = 0;

    for (index, sample) in samples.iter().enumerate() {
        let id = base_id(id_prefix, index);
        rows.push(PendingRow {
            id: id.clone(),
            variant_id: BASE_VARIANT.to_string(),
            text: sample.text.clone(),
            true_label: sample.label.clone(),
        });
        for (i, variant) in generator.generate(index, &sample.text).into_iter().enumerate() {
            fallbacks += usize::from(variant.fell_back);
            rows.push(PendingRow {
                id: id.clone(),
                variant_id: variant_tag(i + 1),
                text: variant.text,
                true_label: sample.label.clone(),
            });
        }
    }

    (rows, fallbacks)
}

/// Pair each pending row with its prediction.
pub fn attach_predictions(
    rows: Vec<PendingRow>,
    predictions: Vec<Prediction>,
) -> Result<Vec<Record>, FlipcheckError> {
    if rows.len() != predictions.len() {
        return Err(FlipcheckError::classifier(format!(
            "{} predictions for {} rows",
            predictions.len(),
            rows.len()
        )));
    }
    Ok(rows
        .into_iter()
        .zip(predictions)
        .map(|(row, p)| row.score(p.label, p.confidence))
        .collect())
}

/// Runs the build pipeline against a corpus and a classifier.
pub struct DatasetBuilder {
    config: FlipcheckConfig,
    corpus: Box<dyn LabeledCorpus>,
    classifier: Box<dyn Classifier>,
    generator: VariantGenerator,
}

impl DatasetBuilder {
    pub fn new(
        config: FlipcheckConfig,
        corpus: Box<dyn LabeledCorpus>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        let generator = VariantGenerator::from_config(&config.build, &config.perturb);
        Self {
            config,
            corpus,
            classifier,
            generator,
        }
    }

    /// Validate `config` and wire up the configured corpus and HTTP classifier.
    pub fn from_config(config: FlipcheckConfig) -> Result<Self, FlipcheckError> {
        config.validate()?;
        let corpus = corpus_from_config(&config.corpus)?;
        let classifier = Box::new(HttpClassifier::new(&config.classifier)?);
        Ok(Self::new(config, corpus, classifier))
    }

    pub fn config(&self) -> &FlipcheckConfig {
        &self.config
    }

    /// Produce the scored table in memory.
    pub async fn build(&self) -> Result<(Table, BuildSummary), FlipcheckError> {
        let build = &self.config.build;
        let samples = draw_sample(self.corpus.as_ref(), build.sample_size, build.seed).await?;

        let (rows, fallbacks) = assemble_rows(&samples, &self.generator, &build.id_prefix);
        info!(
            base = samples.len(),
            rows = rows.len(),
            fallbacks,
            "Generated variants"
        );

        let texts: Vec<String> = rows.iter().map(|r| r.text.clone()).collect();
        let predictions = classify_all(
            self.classifier.as_ref(),
            &texts,
            self.config.classifier.batch_size,
        )
        .await?;
        let table = Table::new(attach_predictions(rows, predictions)?);

        let summary = BuildSummary {
            total_rows: table.len(),
            base_count: samples.len(),
            rows_per_base: self.generator.variants_per_sample() + 1,
            accuracy: accuracy(table.records()),
            flips: flip_stats(&table),
            fallbacks,
            seed: build.seed,
            corpus: self.corpus.source_info(),
            classifier: self.classifier.name().to_string(),
            output: None,
            sha256: None,
            generated_at: Utc::now(),
        };
        Ok((table, summary))
    }

    /// Build and write the table to `data.table_path`, overwriting any existing file.
    pub async fn run(&self) -> Result<BuildSummary, FlipcheckError> {
        let (table, mut summary) = self.build().await?;
        let path = &self.config.data.table_path;
        table.write(path)?;
        let digest = hash_file(path)?;
        info!(path = %path.display(), rows = table.len(), sha256 = %digest, "Wrote table");
        summary.output = Some(path.clone());
        summary.sha256 = Some(digest);
        Ok(summary)
    }
}
