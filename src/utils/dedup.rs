//! Deduplication utilities for papers across sources.

use std::collections::HashSet;

use crate::models::Paper;

/// How two titles are compared when removing duplicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleMatch {
    /// Byte-for-byte title equality
    #[default]
    Exact,
    /// Case-insensitive equality with whitespace runs collapsed
    Normalized,
}

impl TitleMatch {
    fn key(self, title: &str) -> String {
        match self {
            TitleMatch::Exact => title.to_string(),
            TitleMatch::Normalized => normalize_title(title),
        }
    }
}

/// Normalize a title for comparison
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Remove papers whose title was already seen.
///
/// The result is a subsequence of the input: the first occurrence of each
/// title is kept in its original position and later ones are dropped.
pub fn deduplicate_papers(papers: Vec<Paper>, matching: TitleMatch) -> Vec<Paper> {
    let mut seen: HashSet<String> = HashSet::with_capacity(papers.len());

    papers
        .into_iter()
        .filter(|paper| seen.insert(matching.key(&paper.title)))
        .collect()
}

/// Find duplicate papers without removing them
///
/// Returns groups of paper indices sharing a title key, in first-occurrence order
pub fn find_duplicates(papers: &[Paper], matching: TitleMatch) -> Vec<Vec<usize>> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (idx, paper) in papers.iter().enumerate() {
        let key = matching.key(&paper.title);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, indices)) => indices.push(idx),
            None => groups.push((key, vec![idx])),
        }
    }

    groups
        .into_iter()
        .map(|(_, indices)| indices)
        .filter(|indices| indices.len() > 1)
        .collect()
}
