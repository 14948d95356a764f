//! Paper model representing a research paper from any source.

use serde::{Deserialize, Serialize};

/// Abstract text substituted when a source does not provide one
pub const NO_ABSTRACT: &str = "No abstract available";

/// The source/repository where the paper was found
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    PubMed,
    CrossRef,
    Arxiv,
    #[serde(untagged)]
    Other(String),
}

impl SourceType {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceType::PubMed => "PubMed",
            SourceType::CrossRef => "CrossRef",
            SourceType::Arxiv => "arXiv",
            SourceType::Other(s) => s,
        }
    }

    /// Returns the source identifier
    pub fn id(&self) -> &str {
        match self {
            SourceType::PubMed => "pubmed",
            SourceType::CrossRef => "crossref",
            SourceType::Arxiv => "arxiv",
            SourceType::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A research paper normalized from any source
///
/// Every adapter produces this shape. `title` and `url` are never empty and
/// `abstract` always holds text: adapters substitute [`NO_ABSTRACT`] when the
/// source omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title, also the deduplication key
    pub title: String,

    /// Abstract text
    pub r#abstract: String,

    /// Canonical page URL
    pub url: String,

    /// Authors as comma-separated "given family" names
    pub authors: Option<String>,

    /// Source where the paper was found
    pub source: SourceType,
}

impl Paper {
    /// Create a new paper with required fields and the placeholder abstract
    pub fn new(title: String, url: String, source: SourceType) -> Self {
        Self {
            title,
            r#abstract: NO_ABSTRACT.to_string(),
            url,
            authors: None,
            source,
        }
    }

    /// Whether both title and link are non-empty
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Returns the author names as a vector
    pub fn author_list(&self) -> Vec<&str> {
        self.authors
            .as_deref()
            .map(|a| {
                a.split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: SourceType) -> Self {
        Self {
            paper: Paper::new(title.into(), url.into(), source),
        }
    }

    /// Set abstract; blank text keeps the placeholder
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        let text = abstract_text.into();
        if !text.trim().is_empty() {
            self.paper.r#abstract = text;
        }
        self
    }

    /// Set authors; an empty list leaves the field absent
    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        let authors = authors.into();
        if !authors.trim().is_empty() {
            self.paper.authors = Some(authors);
        }
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_builder() {
        let paper = PaperBuilder::new("Test Paper", "https://example.com", SourceType::CrossRef)
            .authors("John Doe, Jane Smith")
            .abstract_text("This is a test abstract.")
            .build();

        assert_eq!(paper.title, "Test Paper");
        assert_eq!(paper.url, "https://example.com");
        assert_eq!(paper.authors.as_deref(), Some("John Doe, Jane Smith"));
        assert_eq!(paper.r#abstract, "This is a test abstract.");
        assert!(paper.is_valid());
    }

    #[test]
    fn test_missing_abstract_uses_placeholder() {
        let paper = PaperBuilder::new("Test", "https://example.com", SourceType::Arxiv)
            .abstract_text("   ")
            .build();

        assert_eq!(paper.r#abstract, NO_ABSTRACT);
        assert!(paper.authors.is_none());
    }

    #[test]
    fn test_author_list() {
        let paper = PaperBuilder::new("Test", "https://example.com", SourceType::CrossRef)
            .authors("John Doe, Jane Smith, Bob Jones")
            .build();

        assert_eq!(paper.author_list(), vec!["John Doe", "Jane Smith", "Bob Jones"]);
    }

    #[test]
    fn test_invalid_without_link() {
        let paper = Paper::new("Title".to_string(), String::new(), SourceType::PubMed);
        assert!(!paper.is_valid());
    }

    #[test]
    fn test_source_type_names() {
        assert_eq!(SourceType::PubMed.id(), "pubmed");
        assert_eq!(SourceType::Arxiv.to_string(), "arXiv");
        assert_eq!(SourceType::Other("mock".into()).name(), "mock");
    }
}
