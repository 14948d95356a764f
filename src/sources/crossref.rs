//! CrossRef research source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Paper, PaperBuilder, SearchQuery, SourceType};
use crate::sources::{get_text, Source, SourceError};
use crate::utils::HttpClient;

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Number of works requested per search
const CROSSREF_ROWS: usize = 10;

/// CrossRef research source
///
/// Uses the CrossRef REST API keyword search. The recency window and review
/// filter do not apply here.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl CrossRefSource {
    pub fn new() -> Result<Self, SourceError> {
        let user_agent = format!(
            "{} / {} (mailto:crossref@crossref.org)",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        Ok(Self::with_client(Arc::new(HttpClient::with_user_agent(
            &user_agent,
        )?)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_BASE.to_string(),
        }
    }

    /// Point the source at a different API root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/works?query={}&rows={}",
            self.base_url,
            urlencoding::encode(&query.topic),
            CROSSREF_ROWS
        )
    }

    fn parse_response(json: &str) -> Result<Vec<Paper>, SourceError> {
        let data: CRResponse = serde_json::from_str(json)?;

        let papers = data
            .message
            .items
            .into_iter()
            .filter_map(|item| {
                let title = item
                    .title
                    .iter()
                    .map(|t| t.trim())
                    .find(|t| !t.is_empty())
                    .unwrap_or_default()
                    .to_string();
                let url = item.url.unwrap_or_default();

                if title.is_empty() || url.is_empty() {
                    return None;
                }

                let authors = item
                    .author
                    .iter()
                    .map(CRAuthor::display_name)
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");

                Some(
                    PaperBuilder::new(title, url, SourceType::CrossRef)
                        .abstract_text(item.r#abstract.unwrap_or_default())
                        .authors(authors)
                        .build(),
                )
            })
            .collect();

        Ok(papers)
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = self.build_search_url(query);
        let json = get_text(&self.client, &url, "CrossRef").await?;
        Self::parse_response(&json)
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "abstract")]
    r#abstract: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
}

impl CRAuthor {
    /// "given family", skipping whichever part is missing
    fn display_name(&self) -> String {
        [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
