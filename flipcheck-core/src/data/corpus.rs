//! Labeled corpus sources and seeded sampling of base items.

use crate::config::{CorpusConfig, CorpusSource};
use crate::error::FlipcheckError;
use crate::label::Label;
use crate::record::LabeledText;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Information about a corpus for provenance in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for loading `(text, label)` pairs.
#[async_trait]
pub trait LabeledCorpus: Send + Sync {
    /// Load every item of the configured split, in the source's stable order.
    async fn load(&self) -> Result<Vec<LabeledText>, FlipcheckError>;

    /// Return metadata about this corpus.
    fn source_info(&self) -> CorpusInfo;
}

/// Build the corpus backend selected by configuration.
pub fn corpus_from_config(config: &CorpusConfig) -> Result<Box<dyn LabeledCorpus>, FlipcheckError> {
    match config.source {
        CorpusSource::HuggingFace => Ok(Box::new(HuggingFaceCorpus::new(config))),
        CorpusSource::Csv => {
            let path = config
                .csv_path
                .clone()
                .ok_or_else(|| FlipcheckError::config("corpus.csv_path is not set"))?;
            Ok(Box::new(CsvCorpus {
                path,
                text_column: config.text_column.clone(),
                label_column: config.label_column.clone(),
            }))
        }
    }
}

/// Shuffle `items` with a seeded RNG and keep the first `size`.
///
/// The same items, size and seed always select the same sample in the same order.
pub fn sample_items(
    mut items: Vec<LabeledText>,
    size: usize,
    seed: u64,
) -> Result<Vec<LabeledText>, FlipcheckError> {
    if size > items.len() {
        return Err(FlipcheckError::corpus(format!(
            "requested {size} samples but the corpus only has {} items",
            items.len()
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items.truncate(size);
    Ok(items)
}

/// Load a corpus and draw the seeded sample from it.
pub async fn draw_sample(
    corpus: &dyn LabeledCorpus,
    size: usize,
    seed: u64,
) -> Result<Vec<LabeledText>, FlipcheckError> {
    let info = corpus.source_info();
    info!(source = %info.source_type, location = %info.location, "Loading corpus");
    let items = corpus.load().await?;
    info!(items = items.len(), size, seed, "Sampling base items");
    sample_items(items, size, seed)
}

// ---------------------------------------------------------------------------
// HuggingFaceCorpus
// ---------------------------------------------------------------------------

/// Hugging Face datasets-server corpus.
///
/// Pages through the `/rows` endpoint until the split is exhausted. Requires network access.
pub struct HuggingFaceCorpus {
    pub endpoint: String,
    pub dataset: String,
    pub config_name: String,
    pub split: String,
    pub text_column: String,
    pub label_column: String,
    pub page_size: usize,
    client: reqwest::Client,
}

impl HuggingFaceCorpus {
    pub fn new(config: &CorpusConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            dataset: config.dataset.clone(),
            config_name: config.config_name.clone(),
            split: config.split.clone(),
            text_column: config.text_column.clone(),
            label_column: config.label_column.clone(),
            page_size: config.page_size.max(1),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, offset: usize) -> Result<serde_json::Value, FlipcheckError> {
        let url = format!("{}/rows", self.endpoint);
        debug!(url = url.as_str(), offset, "Fetching corpus page");
        let offset = offset.to_string();
        let length = self.page_size.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("dataset", self.dataset.as_str()),
                ("config", self.config_name.as_str()),
                ("split", self.split.as_str()),
                ("offset", offset.as_str()),
                ("length", length.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FlipcheckError::corpus(format!(
                "Hugging Face datasets-server returned status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LabeledCorpus for HuggingFaceCorpus {
    async fn load(&self) -> Result<Vec<LabeledText>, FlipcheckError> {
        let mut items = Vec::new();
        let mut offset = 0;
        loop {
            let body = self.fetch_page(offset).await?;
            let page = parse_rows_page(&body, &self.text_column, &self.label_column)?;
            let total = body
                .get("num_rows_total")
                .and_then(|v| v.as_u64())
                .map(|n| n as usize);
            if page.is_empty() {
                break;
            }
            offset += page.len();
            items.extend(page);
            if total.is_some_and(|t| offset >= t) {
                break;
            }
        }
        if items.is_empty() {
            return Err(FlipcheckError::corpus(format!(
                "{}/{} split '{}' returned no rows",
                self.dataset, self.config_name, self.split
            )));
        }
        Ok(items)
    }

    fn source_info(&self) -> CorpusInfo {
        CorpusInfo {
            source_type: "huggingface".to_string(),
            location: format!("{}/{}:{}", self.dataset, self.config_name, self.split),
            accessed_at: chrono::Utc::now(),
        }
    }
}

/// Parse one datasets-server page: `{ "rows": [ { "row": {...} }, ... ] }`.
fn parse_rows_page(
    body: &serde_json::Value,
    text_column: &str,
    label_column: &str,
) -> Result<Vec<LabeledText>, FlipcheckError> {
    let rows = body
        .get("rows")
        .and_then(|v| v.as_array())
        .ok_or_else(|| FlipcheckError::corpus("Unexpected datasets-server response format"))?;

    rows.iter()
        .filter_map(|entry| entry.get("row"))
        .map(|row| {
            let text = row
                .get(text_column)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    FlipcheckError::corpus(format!("row is missing text column '{text_column}'"))
                })?;
            let raw_label = match row.get(label_column) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(FlipcheckError::corpus(format!(
                        "row is missing label column '{label_column}'"
                    )));
                }
            };
            Ok(LabeledText {
                text: text.to_string(),
                label: Label::from_gold(&raw_label)?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CsvCorpus
// ---------------------------------------------------------------------------

/// Local CSV corpus with a header row.
pub struct CsvCorpus {
    pub path: PathBuf,
    pub text_column: String,
    pub label_column: String,
}

#[async_trait]
impl LabeledCorpus for CsvCorpus {
    async fn load(&self) -> Result<Vec<LabeledText>, FlipcheckError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            FlipcheckError::corpus(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                FlipcheckError::corpus(format!(
                    "{} has no '{name}' column",
                    self.path.display()
                ))
            })
        };
        let text_idx = column(&self.text_column)?;
        let label_idx = column(&self.label_column)?;

        let mut items = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let text = record.get(text_idx).unwrap_or("").to_string();
            let label = Label::from_gold(record.get(label_idx).unwrap_or("")).map_err(|e| {
                FlipcheckError::corpus(format!("{} row {}: {e}", self.path.display(), idx + 1))
            })?;
            items.push(LabeledText { text, label });
        }
        Ok(items)
    }

    fn source_info(&self) -> CorpusInfo {
        CorpusInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}
