//! Registry for managing research source adapters.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ArxivSource, CrossRefSource, PubMedSource, Source, SourceError};
use crate::utils::HttpClient;

/// Which of the built-in sources take part in a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSelection {
    #[serde(default = "default_true")]
    pub pubmed: bool,

    #[serde(default = "default_true")]
    pub crossref: bool,

    #[serde(default = "default_true")]
    pub arxiv: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl SourceSelection {
    /// Every built-in source enabled
    pub fn all() -> Self {
        Self {
            pubmed: true,
            crossref: true,
            arxiv: true,
        }
    }

    /// No source enabled
    pub fn none() -> Self {
        Self {
            pubmed: false,
            crossref: false,
            arxiv: false,
        }
    }

    /// Enable only the listed source ids
    pub fn only<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<Self, SourceError> {
        let mut selection = Self::none();
        for id in ids {
            selection.set(id, true)?;
        }
        Ok(selection)
    }

    /// Toggle a source by id
    pub fn set(&mut self, id: &str, enabled: bool) -> Result<(), SourceError> {
        match id {
            "pubmed" => self.pubmed = enabled,
            "crossref" => self.crossref = enabled,
            "arxiv" => self.arxiv = enabled,
            other => {
                return Err(SourceError::InvalidRequest(format!(
                    "Unknown source '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Whether a source id is enabled; unknown ids are treated as enabled
    pub fn is_enabled(&self, id: &str) -> bool {
        match id {
            "pubmed" => self.pubmed,
            "crossref" => self.crossref,
            "arxiv" => self.arxiv,
            _ => true,
        }
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        !(self.pubmed || self.crossref || self.arxiv)
    }
}

/// Registry of available research sources
///
/// Sources keep their registration order, which is also the order results
/// are merged and reported in.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry with the built-in sources: PubMed, CrossRef, arXiv
    pub fn new() -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::new()?);
        Self::with_client(client)
    }

    /// Create the built-in sources sharing one HTTP client
    ///
    /// CrossRef keeps its own client because it announces a polite-pool user agent.
    pub fn with_client(client: Arc<HttpClient>) -> Result<Self, SourceError> {
        let mut registry = Self::empty();

        registry.register(Arc::new(PubMedSource::with_client(Arc::clone(&client))));
        registry.register(Arc::new(CrossRefSource::new()?));
        registry.register(Arc::new(ArxivSource::with_client(client)));

        Ok(registry)
    }

    /// Create a registry without any source
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Register a new source, replacing any source with the same id in place
    pub fn register(&mut self, source: Arc<dyn Source>) {
        match self.sources.iter().position(|s| s.id() == source.id()) {
            Some(idx) => self.sources[idx] = source,
            None => self.sources.push(source),
        }
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Get all registered sources in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Get all source IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Sources enabled by the selection, in registration order
    pub fn select(&self, selection: &SourceSelection) -> Vec<Arc<dyn Source>> {
        self.sources
            .iter()
            .filter(|s| selection.is_enabled(s.id()))
            .cloned()
            .collect()
    }

    /// Check if a source exists
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
