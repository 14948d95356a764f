//! Concurrent multi-source fetch and merge.
//!
//! [`spawn_fetches`] starts one task per source back-to-back, so the requests
//! are in flight together before anything is awaited. [`aggregate`] joins
//! those tasks, reports per-source counts in declared order and deduplicates
//! the merged list.

use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{PipelineError, PipelineObserver};
use crate::models::{Corpus, Paper, SearchQuery};
use crate::sources::Source;
use crate::utils::{deduplicate_papers, TitleMatch};

/// A source fetch that has already been started
#[derive(Debug)]
pub struct PendingSource {
    name: String,
    handle: JoinHandle<Vec<Paper>>,
}

impl PendingSource {
    /// Wrap an already running fetch task
    pub fn new(name: impl Into<String>, handle: JoinHandle<Vec<Paper>>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Number of papers a source returned before deduplication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Result of a successful aggregation
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub corpus: Corpus,
    pub counts: Vec<SourceCount>,
}

/// Start a fetch task for every source without awaiting any of them.
pub fn spawn_fetches(sources: &[Arc<dyn Source>], query: &SearchQuery) -> Vec<PendingSource> {
    sources
        .iter()
        .map(|source| {
            let source = Arc::clone(source);
            let query = query.clone();
            let name = source.name().to_string();
            tracing::debug!(source = %name, topic = %query.topic, "starting fetch");
            let handle = tokio::spawn(async move { source.fetch(&query).await });
            PendingSource::new(name, handle)
        })
        .collect()
}

/// Join started fetches into a deduplicated corpus.
///
/// Fails with [`PipelineError::NoSourceSelected`] when nothing was started and
/// with [`PipelineError::Aggregation`] when any fetch task did not complete
/// (panicked or was cancelled). Counts are reported in the order the fetches
/// were declared, not in completion order.
pub async fn aggregate(
    pending: Vec<PendingSource>,
    matching: TitleMatch,
    observer: &dyn PipelineObserver,
) -> Result<Aggregation, PipelineError> {
    if pending.is_empty() {
        return Err(PipelineError::NoSourceSelected);
    }

    let (names, handles): (Vec<String>, Vec<JoinHandle<Vec<Paper>>>) =
        pending.into_iter().map(|p| (p.name, p.handle)).unzip();

    let results = try_join_all(handles).await.map_err(|e| {
        tracing::error!(error = %e, "source fetch task failed");
        PipelineError::Aggregation(e.to_string())
    })?;

    let mut counts = Vec::with_capacity(names.len());
    let mut all_papers = Vec::new();

    for (name, papers) in names.into_iter().zip(results) {
        tracing::info!(source = %name, count = papers.len(), "results found");
        observer.source_completed(&name, papers.len());
        counts.push(SourceCount {
            source: name,
            count: papers.len(),
        });
        all_papers.extend(papers);
    }

    let total = all_papers.len();
    let unique = deduplicate_papers(all_papers, matching);
    tracing::debug!(total, unique = unique.len(), "deduplicated papers");

    Ok(Aggregation {
        corpus: Corpus::from_papers(unique),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoopObserver;
    use crate::sources::mock::make_paper;
    use crate::sources::MockSource;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(String, usize)>>,
    }

    impl PipelineObserver for Recorder {
        fn source_completed(&self, source: &str, count: usize) {
            self.events.lock().unwrap().push((source.to_string(), count));
        }
    }

    #[tokio::test]
    async fn test_no_source_selected() {
        let result = aggregate(Vec::new(), TitleMatch::Exact, &NoopObserver).await;
        assert!(matches!(result, Err(PipelineError::NoSourceSelected)));
    }

    #[tokio::test]
    async fn test_merge_and_dedup_in_source_order() {
        let a: Arc<dyn Source> = Arc::new(MockSource::with_papers(
            "a",
            vec![make_paper("Shared", "a"), make_paper("Only A", "a")],
        ));
        let b: Arc<dyn Source> = Arc::new(MockSource::with_papers(
            "b",
            vec![make_paper("Shared", "b"), make_paper("Only B", "b")],
        ));

        let pending = spawn_fetches(&[a, b], &SearchQuery::new("CRISPR"));
        let recorder = Recorder::default();
        let aggregation = aggregate(pending, TitleMatch::Exact, &recorder).await.unwrap();

        assert_eq!(aggregation.corpus.titles(), vec!["Shared", "Only A", "Only B"]);
        assert_eq!(aggregation.corpus.papers()[0].url, "http://example.com/a/Shared");
        assert_eq!(
            aggregation.counts,
            vec![
                SourceCount { source: "a".into(), count: 2 },
                SourceCount { source: "b".into(), count: 2 },
            ]
        );
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![("a".to_string(), 2), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_counts_follow_declared_order_not_completion_order() {
        let slow = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            vec![make_paper("Slow", "slow")]
        });
        let fast = tokio::spawn(async { vec![make_paper("Fast", "fast")] });

        let pending = vec![PendingSource::new("slow", slow), PendingSource::new("fast", fast)];
        let recorder = Recorder::default();
        let aggregation = aggregate(pending, TitleMatch::Exact, &recorder).await.unwrap();

        assert_eq!(aggregation.corpus.titles(), vec!["Slow", "Fast"]);
        let order: Vec<String> = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect();
        assert_eq!(order, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let ok: Arc<dyn Source> =
            Arc::new(MockSource::with_papers("ok", vec![make_paper("Kept", "ok")]));
        let broken = MockSource::new("broken");
        broken.fail_with("timeout");
        let broken: Arc<dyn Source> = Arc::new(broken);

        let pending = spawn_fetches(&[ok, broken], &SearchQuery::new("x"));
        let aggregation = aggregate(pending, TitleMatch::Exact, &NoopObserver).await.unwrap();

        assert_eq!(aggregation.corpus.len(), 1);
        assert_eq!(aggregation.counts[1].count, 0);
    }

    #[tokio::test]
    async fn test_aborted_task_fails_whole_aggregation() {
        let ok: Arc<dyn Source> =
            Arc::new(MockSource::with_papers("ok", vec![make_paper("Kept", "ok")]));
        let crashing = MockSource::new("crashing");
        crashing.panic_on_search();
        let crashing: Arc<dyn Source> = Arc::new(crashing);

        let pending = spawn_fetches(&[ok, crashing], &SearchQuery::new("x"));
        let result = aggregate(pending, TitleMatch::Exact, &NoopObserver).await;

        assert!(matches!(result, Err(PipelineError::Aggregation(_))));
    }
}
