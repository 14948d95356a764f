//! Core data models for research papers and search operations.

mod corpus;
mod paper;
mod search;

pub use corpus::Corpus;
pub use paper::{Paper, PaperBuilder, SourceType, NO_ABSTRACT};
pub use search::{SearchQuery, DEFAULT_DAYS};
