//! Research source adapters with a trait-based architecture.
//!
//! This module defines the [`Source`] trait that every literature source
//! implements. An adapter turns a [`SearchQuery`] into source-specific HTTP
//! calls and normalizes the payload into [`Paper`] records.
//!
//! # Available Sources
//!
//! - `pubmed` - PubMed via NCBI E-utilities (two-stage search then fetch)
//! - `crossref` - CrossRef works search
//! - `arxiv` - arXiv Atom query API
//!
//! # Failure Semantics
//!
//! [`Source::search`] reports errors normally. [`Source::fetch`] is what the
//! aggregation pipeline calls: it never fails. Any error is logged through
//! `tracing` and replaced by an empty list, so one broken source cannot abort
//! a multi-source search.

mod arxiv;
mod crossref;
mod pubmed;
mod registry;

pub mod mock;

pub use arxiv::ArxivSource;
pub use crossref::CrossRefSource;
pub use mock::MockSource;
pub use pubmed::PubMedSource;
pub use registry::{SourceRegistry, SourceSelection};

use crate::models::{Paper, SearchQuery};
use async_trait::async_trait;

/// The Source trait defines the interface for all research source adapters.
///
/// # Implementing a New Source
///
/// 1. Create a new struct that implements `Source`
/// 2. Implement `id`, `name` and `search`
/// 3. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "arxiv", "pubmed")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for papers matching the query
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError>;

    /// Search, degrading any failure to an empty result.
    async fn fetch(&self, query: &SearchQuery) -> Vec<Paper> {
        match self.search(query).await {
            Ok(papers) => papers,
            Err(e) => {
                tracing::warn!(source = self.id(), error = %e, "source search failed");
                Vec::new()
            }
        }
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, Atom)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Send a GET request and return the body of a successful response.
pub(crate) async fn get_text(
    client: &crate::utils::HttpClient,
    url: &str,
    source_name: &str,
) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to query {}: {}", source_name, e)))?;

    if !response.status().is_success() {
        return Err(SourceError::Api(format!(
            "{} API returned status: {}",
            source_name,
            response.status()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_swallows_errors() {
        let source = MockSource::new("broken");
        source.fail_with("connection reset");

        let query = SearchQuery::new("anything");
        assert!(source.search(&query).await.is_err());
        assert!(source.fetch(&query).await.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Parse("bad".into());
        assert_eq!(err.to_string(), "Parse error: bad");
    }
}
