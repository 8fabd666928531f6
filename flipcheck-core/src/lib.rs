//! # flipcheck-core
//!
//! Builds a perturbation-robustness table for a sentiment classifier and validates it.
//!
//! The [`builder`] samples labeled base items, generates perturbed variants of each,
//! classifies every text and writes one CSV row per text. The [`eval`] module reloads
//! that table and recomputes flip rate, accuracy, and confidence discrimination.

// Foundation
pub mod config;
pub mod error;
pub mod label;
pub mod record;

// Data
pub mod data;

// Pipeline stages
pub mod builder;
pub mod inference;
pub mod perturb;

// Validation
pub mod eval;

pub use builder::{BuildSummary, DatasetBuilder};
pub use config::{ConfidenceMetric, FlipcheckConfig, load_config};
pub use error::FlipcheckError;
pub use eval::{MetricsValidator, ValidationReport};
pub use label::{Label, normalize_label};
pub use record::Record;
