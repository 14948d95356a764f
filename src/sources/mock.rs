//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::{Paper, SearchQuery, SourceType};
use crate::sources::{Source, SourceError};

#[derive(Debug, Clone)]
enum Behavior {
    Papers(Vec<Paper>),
    Fail(String),
    Panic,
}

/// A mock source for testing that returns predefined responses.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    behavior: Mutex<Behavior>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl MockSource {
    /// Create a new mock source that returns no papers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            behavior: Mutex::new(Behavior::Papers(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock source that returns the given papers.
    pub fn with_papers(id: impl Into<String>, papers: Vec<Paper>) -> Self {
        let source = Self::new(id);
        source.set_papers(papers);
        source
    }

    /// Set the papers to return.
    pub fn set_papers(&self, papers: Vec<Paper>) {
        if let Ok(mut guard) = self.behavior.lock() {
            *guard = Behavior::Papers(papers);
        }
    }

    /// Make every search fail with a network error.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.behavior.lock() {
            *guard = Behavior::Fail(message.into());
        }
    }

    /// Make every search panic, which aborts the task running it.
    pub fn panic_on_search(&self) {
        if let Ok(mut guard) = self.behavior.lock() {
            *guard = Behavior::Panic;
        }
    }

    /// Queries received so far.
    pub fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.clone());
        }

        let behavior = self
            .behavior
            .lock()
            .map(|b| b.clone())
            .map_err(|e| SourceError::Other(e.to_string()))?;

        match behavior {
            Behavior::Papers(papers) => Ok(papers),
            Behavior::Fail(message) => Err(SourceError::Network(message)),
            Behavior::Panic => panic!("mock source '{}' panicked", self.id),
        }
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(title: &str, source: &str) -> Paper {
    Paper::new(
        title.to_string(),
        format!("http://example.com/{}/{}", source, title.replace(' ', "-")),
        SourceType::Other(source.to_string()),
    )
}
