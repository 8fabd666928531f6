//! Configuration for dataset building and validation.
//!
//! Uses `figment` for layered configuration: defaults -> user config -> workspace config
//! -> environment. Configuration is loaded from `<config dir>/flipcheck/config.toml`
//! and/or `.flipcheck/config.toml` in the workspace directory. CLI flags are applied
//! on top by the binary after loading.

use crate::error::FlipcheckError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration shared by the builder and the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlipcheckConfig {
    /// Location of the shared table.
    #[serde(default)]
    pub data: DataConfig,
    /// Where base items come from.
    #[serde(default)]
    pub corpus: CorpusConfig,
    /// Sampling and variant generation.
    #[serde(default)]
    pub build: BuildConfig,
    /// Perturbation method tuning.
    #[serde(default)]
    pub perturb: PerturbConfig,
    /// Sentiment classifier endpoint.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Validator expectations and report mode.
    #[serde(default)]
    pub validate: ValidateConfig,
}

impl FlipcheckConfig {
    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), FlipcheckError> {
        if self.build.sample_size == 0 {
            return Err(FlipcheckError::config("build.sample_size must be at least 1"));
        }
        if self.build.methods.is_empty() {
            return Err(FlipcheckError::config(
                "build.methods must name at least one perturbation method",
            ));
        }
        if self.classifier.batch_size == 0 {
            return Err(FlipcheckError::config("classifier.batch_size must be at least 1"));
        }
        if self.corpus.page_size == 0 {
            return Err(FlipcheckError::config("corpus.page_size must be at least 1"));
        }
        if self.corpus.source == CorpusSource::Csv && self.corpus.csv_path.is_none() {
            return Err(FlipcheckError::config(
                "corpus.csv_path is required when corpus.source = \"csv\"",
            ));
        }
        for (name, p) in [
            ("perturb.keyboard_word_prob", self.perturb.keyboard_word_prob),
            ("perturb.synonym_word_prob", self.perturb.synonym_word_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(FlipcheckError::config(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.validate.flip_rate_tolerance < 0.0 || self.validate.base_accuracy_tolerance < 0.0 {
            return Err(FlipcheckError::config("validate tolerances must be non-negative"));
        }
        Ok(())
    }
}

/// Shared artifact location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV table written by the builder and read by the validator.
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table_path: default_table_path(),
        }
    }
}

fn default_table_path() -> PathBuf {
    PathBuf::from("data/checklist/sst2_ci_demo.csv")
}

/// Which corpus backend supplies base items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusSource {
    HuggingFace,
    Csv,
}

/// Labeled corpus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_source")]
    pub source: CorpusSource,
    /// Hugging Face dataset name.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Hugging Face dataset configuration (subset).
    #[serde(default = "default_config_name")]
    pub config_name: String,
    #[serde(default = "default_split")]
    pub split: String,
    /// Local CSV corpus, used when `source = "csv"`.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Rows requested per datasets-server page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_corpus_endpoint")]
    pub endpoint: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source: default_corpus_source(),
            dataset: default_dataset(),
            config_name: default_config_name(),
            split: default_split(),
            csv_path: None,
            text_column: default_text_column(),
            label_column: default_label_column(),
            page_size: default_page_size(),
            endpoint: default_corpus_endpoint(),
        }
    }
}

fn default_corpus_source() -> CorpusSource {
    CorpusSource::HuggingFace
}

fn default_dataset() -> String {
    "glue".to_string()
}

fn default_config_name() -> String {
    "sst2".to_string()
}

fn default_split() -> String {
    "validation".to_string()
}

fn default_text_column() -> String {
    "sentence".to_string()
}

fn default_label_column() -> String {
    "label".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_corpus_endpoint() -> String {
    "https://datasets-server.huggingface.co".to_string()
}

/// A perturbation method selectable in `build.methods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerturbMethod {
    /// Keyboard-neighbour character typos.
    Keyboard,
    /// Word-level synonym substitution.
    Synonym,
}

impl fmt::Display for PerturbMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyboard => write!(f, "keyboard"),
            Self::Synonym => write!(f, "synonym"),
        }
    }
}

/// Dataset builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Number of base items drawn from the corpus.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Perturbed variants generated per base item.
    #[serde(default = "default_variants")]
    pub variants_per_sample: usize,
    /// Seed for corpus sampling and perturbation.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Prefix of generated ids (`{prefix}_0000`).
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Methods applied round-robin across variant indices.
    #[serde(default = "default_methods")]
    pub methods: Vec<PerturbMethod>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            variants_per_sample: default_variants(),
            seed: default_seed(),
            id_prefix: default_id_prefix(),
            methods: default_methods(),
        }
    }
}

fn default_sample_size() -> usize {
    500
}

fn default_variants() -> usize {
    3
}

fn default_seed() -> u64 {
    42
}

fn default_id_prefix() -> String {
    "sst2".to_string()
}

fn default_methods() -> Vec<PerturbMethod> {
    vec![PerturbMethod::Keyboard, PerturbMethod::Synonym]
}

/// Perturbation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerturbConfig {
    /// Probability that an eligible word receives typos.
    #[serde(default = "default_word_prob")]
    pub keyboard_word_prob: f64,
    /// Maximum characters replaced inside one selected word.
    #[serde(default = "default_max_chars")]
    pub keyboard_max_chars: usize,
    /// Probability that a word with a known synonym is replaced.
    #[serde(default = "default_word_prob")]
    pub synonym_word_prob: f64,
}

impl Default for PerturbConfig {
    fn default() -> Self {
        Self {
            keyboard_word_prob: default_word_prob(),
            keyboard_max_chars: default_max_chars(),
            synonym_word_prob: default_word_prob(),
        }
    }
}

fn default_word_prob() -> f64 {
    0.3
}

fn default_max_chars() -> usize {
    2
}

/// Sentiment classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL; the model name is appended as a path segment.
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    /// Environment variable holding the bearer token, if any.
    #[serde(default = "default_token_env")]
    pub api_token_env: String,
    /// Texts per inference request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_classifier_endpoint(),
            api_token_env: default_token_env(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}

fn default_classifier_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_token_env() -> String {
    "HF_TOKEN".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout() -> u64 {
    60
}

/// Confidence discrimination statistic reported by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceMetric {
    /// ROC AUC of confidence against correctness, base rows only.
    Auc,
    /// Mean confidence of correct rows minus mean confidence of errors, all rows.
    MeanGap,
}

impl fmt::Display for ConfidenceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auc => write!(f, "auc"),
            Self::MeanGap => write!(f, "mean-gap"),
        }
    }
}

impl FromStr for ConfidenceMetric {
    type Err = FlipcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auc" => Ok(Self::Auc),
            "mean-gap" | "mean_gap" | "gap" => Ok(Self::MeanGap),
            other => Err(FlipcheckError::config(format!(
                "unknown confidence metric '{other}' (expected 'auc' or 'mean-gap')"
            ))),
        }
    }
}

/// Validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateConfig {
    #[serde(default = "default_metric")]
    pub metric: ConfidenceMetric,
    /// Expected flip rate in percent.
    #[serde(default = "default_expected_flip")]
    pub expected_flip_rate: f64,
    /// Allowed deviation from `expected_flip_rate`, in percentage points.
    #[serde(default = "default_flip_tolerance")]
    pub flip_rate_tolerance: f64,
    /// Expected base accuracy in percent.
    #[serde(default = "default_expected_base_accuracy")]
    pub expected_base_accuracy: f64,
    /// Allowed deviation from `expected_base_accuracy`, in percentage points.
    #[serde(default = "default_accuracy_tolerance")]
    pub base_accuracy_tolerance: f64,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            expected_flip_rate: default_expected_flip(),
            flip_rate_tolerance: default_flip_tolerance(),
            expected_base_accuracy: default_expected_base_accuracy(),
            base_accuracy_tolerance: default_accuracy_tolerance(),
        }
    }
}

fn default_metric() -> ConfidenceMetric {
    ConfidenceMetric::Auc
}

fn default_expected_flip() -> f64 {
    42.8
}

fn default_flip_tolerance() -> f64 {
    1.0
}

fn default_expected_base_accuracy() -> f64 {
    90.0
}

fn default_accuracy_tolerance() -> f64 {
    2.0
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".flipcheck").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "flipcheck", "flipcheck")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `FLIPCHECK_`, `__` separates sections)
/// 2. Workspace-local config (`.flipcheck/config.toml`)
/// 3. User config (`~/.config/flipcheck/config.toml`)
/// 4. Built-in defaults
pub fn load_config(workspace: Option<&Path>) -> Result<FlipcheckConfig, FlipcheckError> {
    let mut figment = Figment::from(Serialized::defaults(FlipcheckConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // FLIPCHECK_BUILD__SAMPLE_SIZE, FLIPCHECK_VALIDATE__METRIC, etc.
    figment = figment.merge(Env::prefixed("FLIPCHECK_").split("__"));

    figment
        .extract()
        .map_err(|e| FlipcheckError::config(e.to_string()))
}
