//! Table statistics and the independent metrics validator.

pub mod metrics;
pub mod validator;

pub use metrics::{AccuracyStats, ConfidenceSplit, FlipStats};
pub use validator::{ConfidenceReport, MetricsValidator, ValidationReport};
