//! arXiv research source implementation.

use async_trait::async_trait;
use feed_rs::parser;
use std::sync::Arc;

use crate::models::{Paper, PaperBuilder, SearchQuery, SourceType};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api";

/// Number of entries requested per search
const ARXIV_MAX_RESULTS: usize = 10;

/// arXiv research source
///
/// Keyword search over all fields via the Atom query API. Entries are kept
/// in feed order.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
        }
    }

    /// Point the source at a different API root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/query?search_query=all:{}&start=0&max_results={}",
            self.base_url,
            urlencoding::encode(&query.topic),
            ARXIV_MAX_RESULTS
        )
    }

    /// Parse an Atom feed body into papers
    fn parse_feed(bytes: &[u8]) -> Result<Vec<Paper>, SourceError> {
        let feed = parser::parse(bytes)
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        Ok(feed.entries.iter().filter_map(Self::parse_entry).collect())
    }

    /// Parse arXiv Atom feed entry into Paper
    fn parse_entry(entry: &feed_rs::model::Entry) -> Option<Paper> {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        // The entry id is the abstract page URL
        let url = if entry.id.starts_with("http") {
            entry.id.clone()
        } else {
            entry.links.first().map(|l| l.href.clone()).unwrap_or_default()
        };

        if title.trim().is_empty() || url.is_empty() {
            tracing::debug!(id = %entry.id, "skipping arXiv entry without title or link");
            return None;
        }

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.as_str())
            .unwrap_or("");

        let authors = entry
            .authors
            .iter()
            .map(|a| a.name.trim())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Some(
            PaperBuilder::new(title, url, SourceType::Arxiv)
                .abstract_text(abstract_text)
                .authors(authors)
                .build(),
        )
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = self.build_search_url(query);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv results: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "arXiv API returned status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        Self::parse_feed(bytes.as_ref())
    }
}
