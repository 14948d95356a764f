//! The deduplicated set of papers handed to summarization.

use serde::Serialize;

use super::Paper;

/// Deduplicated, merged papers for a single summarization request.
///
/// Built once per search and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Corpus {
    papers: Vec<Paper>,
}

impl Corpus {
    /// Wrap papers that are already deduplicated
    pub fn from_papers(papers: Vec<Paper>) -> Self {
        Self { papers }
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Paper> {
        self.papers.iter()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Titles in corpus order
    pub fn titles(&self) -> Vec<&str> {
        self.papers.iter().map(|p| p.title.as_str()).collect()
    }

    pub fn into_papers(self) -> Vec<Paper> {
        self.papers
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Paper;
    type IntoIter = std::slice::Iter<'a, Paper>;

    fn into_iter(self) -> Self::IntoIter {
        self.papers.iter()
    }
}
