//! Corpus ingestion and the shared CSV table.

pub mod corpus;
pub mod table;

pub use corpus::{CorpusInfo, CsvCorpus, HuggingFaceCorpus, LabeledCorpus};
pub use table::{IntegrityIssue, Table};
