//! Utility modules supporting research operations.
//!
//! - [`deduplicate_papers`]: Remove papers whose title was already seen
//! - [`find_duplicates`]: Find duplicates without modifying the original list
//! - [`TitleMatch`]: Exact or normalized title comparison
//! - [`HttpClient`]: Shared HTTP client with default timeouts
//!
//! # Deduplication
//!
//! ```rust
//! use research_digest::utils::{deduplicate_papers, TitleMatch};
//! use research_digest::models::Paper;
//!
//! # fn example(papers: Vec<Paper>) {
//! let unique = deduplicate_papers(papers, TitleMatch::Exact);
//! # }
//! ```

mod dedup;
mod http;

pub use dedup::{deduplicate_papers, find_duplicates, normalize_title, TitleMatch};
pub use http::{HttpClient, DEFAULT_TIMEOUT_SECS};
