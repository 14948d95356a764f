//! # Research Digest
//!
//! Aggregates recent literature on a topic from several research sources,
//! deduplicates the results and asks a chat-completion model for a single
//! narrative summary.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, SearchQuery, Corpus)
//! - [`sources`]: Source adapters behind the [`Source`] trait
//! - [`pipeline`]: Aggregation, prompt composition, summarization and annotation handling
//! - [`utils`]: HTTP client and deduplication
//! - [`config`]: Persisted settings
//! - [`ui`]: Terminal output helpers for the binary

pub mod config;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Corpus, Paper};
pub use pipeline::{Pipeline, PipelineError, SearchSession};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
