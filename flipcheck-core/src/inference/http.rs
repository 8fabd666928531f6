//! HTTP classifier backend for the Hugging Face Inference API and compatible servers.

use super::{Classifier, RawPrediction};
use crate::config::ClassifierConfig;
use crate::error::FlipcheckError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Text-classification client posting `{"inputs": [...]}` to `{endpoint}/{model}`.
pub struct HttpClassifier {
    url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpClassifier {
    /// Create a client from configuration, reading the token from `api_token_env` if set.
    pub fn new(config: &ClassifierConfig) -> Result<Self, FlipcheckError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_token = std::env::var(&config.api_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if api_token.is_none() {
            debug!(var = config.api_token_env.as_str(), "No classifier API token set");
        }
        Ok(Self {
            url: format!("{}/{}", config.endpoint.trim_end_matches('/'), config.model),
            api_token,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.url
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>, FlipcheckError> {
        let body = serde_json::json!({
            "inputs": texts,
            "options": { "wait_for_model": true },
        });
        debug!(url = self.url.as_str(), batch = texts.len(), "Sending classification request");

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            FlipcheckError::classifier(format!("request to {} failed: {e}", self.url))
        })?;

        let status = response.status();
        let body_text = response.text().await?;
        if !status.is_success() {
            return Err(FlipcheckError::classifier(format!(
                "{} returned status {status}: {body_text}",
                self.url
            )));
        }

        let value: Value = serde_json::from_str(&body_text)?;
        parse_response(&value)
    }
}

/// Parse a text-classification response.
///
/// Accepts `[[{label, score}, ...], ...]` (all scores per input, the top one is kept)
/// and `[{label, score}, ...]` (one top prediction per input).
fn parse_response(value: &Value) -> Result<Vec<RawPrediction>, FlipcheckError> {
    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(FlipcheckError::classifier(message.to_string()));
    }
    let items = value
        .as_array()
        .ok_or_else(|| FlipcheckError::classifier("expected a JSON array response"))?;

    items
        .iter()
        .map(|item| match item {
            Value::Array(candidates) => candidates
                .iter()
                .map(parse_candidate)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .ok_or_else(|| FlipcheckError::classifier("empty candidate list")),
            other => parse_candidate(other),
        })
        .collect()
}

fn parse_candidate(value: &Value) -> Result<RawPrediction, FlipcheckError> {
    let label = value
        .get("label")
        .and_then(|l| l.as_str())
        .ok_or_else(|| FlipcheckError::classifier("prediction without a label"))?;
    let score = value
        .get("score")
        .and_then(|s| s.as_f64())
        .ok_or_else(|| FlipcheckError::classifier("prediction without a score"))?;
    Ok(RawPrediction {
        label: label.to_string(),
        score,
    })
}
