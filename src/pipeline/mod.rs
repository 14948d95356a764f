//! The search pipeline: fetch, merge, prompt, summarize.
//!
//! Data flows one way:
//!
//! ```text
//! sources -> aggregate -> prompt -> summary -> annotate
//! ```
//!
//! [`Pipeline`] owns the stages. [`SearchSession`] drives one run at a time
//! through the [`SearchState`] machine and rejects overlapping runs.

pub mod aggregate;
pub mod annotate;
pub mod prompt;
pub mod state;
pub mod summary;

pub use aggregate::{aggregate, spawn_fetches, Aggregation, PendingSource, SourceCount};
pub use annotate::{AnnotatedSummary, Annotation, AnnotationError};
pub use prompt::{compose, PromptRequest, DEFAULT_PROMPT, TOPIC_PLACEHOLDER};
pub use state::{validate_transition, SearchState, TransitionError};
pub use summary::{strip_fences, SummaryClient, SummaryError, DEFAULT_MODEL};

use crate::models::{Corpus, SearchQuery};
use crate::sources::{SourceRegistry, SourceSelection};
use crate::utils::TitleMatch;

/// Errors surfaced to whoever started a search
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Please fill out all fields ({0} is missing)")]
    MissingField(&'static str),

    #[error("Please select at least one database")]
    NoSourceSelected,

    #[error("An error occurred while fetching data: {0}")]
    Aggregation(String),

    #[error("An error occurred with the summarization API: {0}")]
    Summary(#[from] SummaryError),

    #[error("A search is already running ({0})")]
    Busy(SearchState),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Receives progress while a session runs
pub trait PipelineObserver: Send + Sync {
    fn state_changed(&self, _state: SearchState) {}

    /// Called once per source, in declared order, after all fetches finished
    fn source_completed(&self, _source: &str, _count: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Everything one search needs, resolved from settings by the caller
#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub query: SearchQuery,
    pub selection: SourceSelection,
    pub api_key: String,
    pub model: String,
    pub prompt_template: String,
    pub title_match: TitleMatch,
}

impl DigestRequest {
    pub fn new(query: SearchQuery, api_key: impl Into<String>) -> Self {
        Self {
            query,
            selection: SourceSelection::all(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            prompt_template: DEFAULT_PROMPT.to_string(),
            title_match: TitleMatch::default(),
        }
    }

    pub fn selection(mut self, selection: SourceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn title_match(mut self, title_match: TitleMatch) -> Self {
        self.title_match = title_match;
        self
    }

    /// Check the inputs a search cannot start without.
    ///
    /// Source selection is checked separately so that the empty case keeps
    /// its own error.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::MissingField("api key"));
        }
        if self.query.topic.trim().is_empty() {
            return Err(PipelineError::MissingField("topic"));
        }
        if self.query.days == 0 {
            return Err(PipelineError::MissingField("days"));
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::MissingField("model"));
        }
        Ok(())
    }
}

/// Output of a completed search
#[derive(Debug, Clone)]
pub struct Digest {
    pub counts: Vec<SourceCount>,
    pub corpus: Corpus,
    pub summary: String,
}

/// The fetch and summarization stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: SourceRegistry,
    summarizer: SummaryClient,
}

impl Pipeline {
    pub fn new(registry: SourceRegistry, summarizer: SummaryClient) -> Self {
        Self {
            registry,
            summarizer,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Fetch from every selected source and merge the results.
    pub async fn gather(
        &self,
        request: &DigestRequest,
        observer: &dyn PipelineObserver,
    ) -> Result<Aggregation, PipelineError> {
        let sources = self.registry.select(&request.selection);
        if sources.is_empty() {
            return Err(PipelineError::NoSourceSelected);
        }

        let pending = spawn_fetches(&sources, &request.query);
        aggregate(pending, request.title_match, observer).await
    }

    /// Build the prompt for a gathered corpus.
    pub fn prompt(&self, request: &DigestRequest, corpus: &Corpus) -> PromptRequest {
        compose(&request.prompt_template, &request.query.topic, corpus)
    }

    /// Ask the model for the summary of a gathered corpus.
    pub async fn summarize(
        &self,
        request: &DigestRequest,
        corpus: &Corpus,
    ) -> Result<String, PipelineError> {
        let prompt = self.prompt(request, corpus);
        let summary = self
            .summarizer
            .summarize(&prompt, &request.api_key, &request.model)
            .await?;
        Ok(summary)
    }
}

/// Runs searches one at a time
#[derive(Debug)]
pub struct SearchSession {
    pipeline: Pipeline,
    state: SearchState,
}

impl SearchSession {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            state: SearchState::Idle,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Return to Idle after a run was dropped before finishing
    pub fn reset(&mut self) {
        if self.state != SearchState::Idle {
            tracing::debug!(from = ?self.state, "search session reset");
        }
        self.state = SearchState::Idle;
    }

    /// Run a full search.
    ///
    /// Invalid input is rejected before the state changes. Any failure after
    /// that leaves the session in [`SearchState::Failed`], from which a new
    /// run may start.
    pub async fn run(
        &mut self,
        request: &DigestRequest,
        observer: &dyn PipelineObserver,
    ) -> Result<Digest, PipelineError> {
        if !self.state.is_ready() {
            return Err(PipelineError::Busy(self.state));
        }
        request.validate()?;

        self.transition(SearchState::Searching, observer)?;
        let result = self.execute(request, observer).await;

        match &result {
            Ok(digest) => {
                tracing::info!(
                    papers = digest.corpus.len(),
                    summary_bytes = digest.summary.len(),
                    "search completed"
                );
                self.transition(SearchState::Done, observer)?;
            }
            Err(e) => {
                tracing::error!(error = %e, "search failed");
                self.transition(SearchState::Failed, observer)?;
            }
        }

        result
    }

    async fn execute(
        &mut self,
        request: &DigestRequest,
        observer: &dyn PipelineObserver,
    ) -> Result<Digest, PipelineError> {
        let Aggregation { corpus, counts } = self.pipeline.gather(request, observer).await?;

        self.transition(SearchState::Summarizing, observer)?;
        let summary = self.pipeline.summarize(request, &corpus).await?;

        Ok(Digest {
            counts,
            corpus,
            summary,
        })
    }

    fn transition(
        &mut self,
        to: SearchState,
        observer: &dyn PipelineObserver,
    ) -> Result<(), PipelineError> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = ?self.state, to = ?to, "search state");
        self.state = to;
        observer.state_changed(to);
        Ok(())
    }
}
