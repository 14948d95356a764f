use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use research_digest::config::{self, Settings, SettingsError, SettingsStore};
use research_digest::models::SearchQuery;
use research_digest::pipeline::{
    AnnotatedSummary, DigestRequest, Pipeline, PipelineError, PipelineObserver, SearchSession,
    SearchState, SummaryClient,
};
use research_digest::sources::{SourceRegistry, SourceSelection};
use research_digest::ui::{self, Status};
use research_digest::utils::{HttpClient, TitleMatch, DEFAULT_TIMEOUT_SECS};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Digest - summarize recent literature on a topic
#[derive(Parser, Debug)]
#[command(name = "research-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate recent papers from PubMed, CrossRef and arXiv and summarize them with an LLM", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Settings file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Source request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Built-in sources
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceArg {
    #[value(name = "pubmed")]
    Pubmed,
    #[value(name = "crossref")]
    CrossRef,
    #[value(name = "arxiv")]
    Arxiv,
}

impl SourceArg {
    fn id(&self) -> &'static str {
        match self {
            SourceArg::Pubmed => "pubmed",
            SourceArg::CrossRef => "crossref",
            SourceArg::Arxiv => "arxiv",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the selected sources and summarize the results
    #[command(alias = "s")]
    Search {
        /// Topic to search for (defaults to the last saved topic)
        topic: Option<String>,

        /// Only include papers from the last N days (PubMed)
        #[arg(long, short)]
        days: Option<u32>,

        /// Source to search; repeat to select several (defaults to saved selection)
        #[arg(long = "source", short = 's', value_enum)]
        sources: Vec<SourceArg>,

        /// Restrict PubMed to review articles
        #[arg(long, value_name = "BOOL")]
        reviews_only: Option<bool>,

        /// Chat model
        #[arg(long, short)]
        model: Option<String>,

        /// Read the prompt template from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// API key for the chat-completion endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// Write the summary to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Render every annotation expanded
        #[arg(long)]
        expand_annotations: bool,

        /// Treat titles differing only in case or spacing as duplicates
        #[arg(long)]
        normalize_titles: bool,

        /// Print the composed prompt and stop before calling the model
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List available sources
    Sources,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Change one setting and save it
    Set {
        /// Setting name, e.g. days or sources.arxiv
        key: String,

        /// New value
        value: String,
    },

    /// Restore the built-in prompt template
    ResetPrompt,

    /// Print the settings file location
    Path,
}

/// Prints progress to stderr
struct CliObserver {
    quiet: bool,
}

impl PipelineObserver for CliObserver {
    fn state_changed(&self, state: SearchState) {
        if !self.quiet {
            ui::print_state(state);
        }
    }

    fn source_completed(&self, source: &str, count: usize) {
        if !self.quiet {
            ui::print_count(source, count);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("research_digest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_path().context("Could not determine the config directory")?,
    };
    tracing::debug!(path = %settings_path.display(), "settings file");

    match cli.command {
        Commands::Search {
            topic,
            days,
            sources,
            reviews_only,
            model,
            prompt_file,
            api_key,
            output,
            expand_annotations,
            normalize_titles,
            dry_run,
        } => {
            let mut settings = Settings::load(&settings_path)?;

            if let Some(topic) = topic {
                let mut store = SettingsStore::open(&settings_path)?;
                if store.set("topic", &topic)? {
                    tracing::info!(%topic, "saved topic");
                }
                settings.topic = topic;
            }
            if let Some(days) = days {
                settings.days = days;
            }
            if let Some(reviews_only) = reviews_only {
                settings.reviews_only = reviews_only;
            }
            if let Some(model) = model {
                settings.model = model;
            }
            if let Some(api_key) = api_key {
                settings.api_key = api_key;
            }

            let prompt_template = match prompt_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
                None => settings.prompt_template.clone(),
            };

            let selection = if sources.is_empty() {
                settings.sources
            } else {
                SourceSelection::only(sources.iter().map(SourceArg::id))?
            };

            let title_match = if normalize_titles {
                TitleMatch::Normalized
            } else {
                TitleMatch::Exact
            };

            let query = SearchQuery::new(settings.topic.clone())
                .days(settings.days)
                .reviews_only(settings.reviews_only);

            let request = DigestRequest::new(query, settings.api_key.clone())
                .selection(selection)
                .model(settings.model.clone())
                .prompt_template(prompt_template)
                .title_match(title_match);

            let pipeline = build_pipeline(cli.timeout)?;
            let observer = CliObserver { quiet: cli.quiet };

            if dry_run {
                return dry_run_prompt(&pipeline, &request, &observer).await;
            }

            let mut session = SearchSession::new(pipeline);
            let digest = session.run(&request, &observer).await?;

            let mut summary = AnnotatedSummary::parse(digest.summary)?;
            summary.activate();
            if expand_annotations {
                summary.expand_all();
            }
            let rendered = summary.render();

            match output {
                Some(path) => {
                    write_output(&path, &rendered)?;
                    if !cli.quiet {
                        ui::print_status(
                            Status::Success,
                            &format!("Summary written to {}", path.display()),
                        );
                    }
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let settings = Settings::load(&settings_path)?;
                println!("{}", toml::to_string_pretty(&settings.redacted())?);
            }
            ConfigCommands::Set { key, value } => {
                let mut store = SettingsStore::open(&settings_path)?;
                let changed = match store.set(&key, &value) {
                    Err(SettingsError::UnknownKey(key)) => anyhow::bail!(
                        "Unknown setting '{}'. Valid settings: {}",
                        key,
                        Settings::KEYS.join(", ")
                    ),
                    other => other?,
                };
                if changed {
                    ui::print_status(Status::Success, &format!("Saved {}", key));
                } else {
                    ui::print_status(Status::Info, &format!("{} unchanged", key));
                }
            }
            ConfigCommands::ResetPrompt => {
                let mut store = SettingsStore::open(&settings_path)?;
                store.reset_prompt()?;
                ui::print_status(Status::Success, "Prompt template reset to default");
            }
            ConfigCommands::Path => {
                println!("{}", settings_path.display());
            }
        },

        Commands::Sources => {
            let settings = Settings::load(&settings_path)?;
            let registry = SourceRegistry::new()?;

            for source in registry.all() {
                let state = if settings.sources.is_enabled(source.id()) {
                    "enabled"
                } else {
                    "disabled"
                };
                println!(
                    "{} {} - {} ({})",
                    ui::source_icon(source.id()),
                    source.id(),
                    source.name(),
                    state
                );
            }
        }
    }

    Ok(())
}

fn build_pipeline(timeout_secs: u64) -> Result<Pipeline> {
    let client = Arc::new(HttpClient::with_timeout(Duration::from_secs(timeout_secs))?);
    let registry = SourceRegistry::with_client(client)?;
    let summarizer = SummaryClient::new()?;
    Ok(Pipeline::new(registry, summarizer))
}

/// Gather papers and print the prompt that would be sent
async fn dry_run_prompt(
    pipeline: &Pipeline,
    request: &DigestRequest,
    observer: &CliObserver,
) -> Result<()> {
    if request.query.topic.trim().is_empty() {
        return Err(PipelineError::MissingField("topic").into());
    }

    let aggregation = pipeline.gather(request, observer).await?;

    if !observer.quiet {
        ui::print_section(&format!("{} unique papers", aggregation.corpus.len()));
        for paper in aggregation.corpus.iter() {
            eprintln!("{}", ui::paper_line(paper));
        }
        ui::print_divider();
    }

    let prompt = pipeline.prompt(request, &aggregation.corpus);
    println!("{}\n\n{}", prompt.system_prompt, prompt.user_content);
    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
