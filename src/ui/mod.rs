//! Terminal output helpers for the CLI.
//!
//! Progress and status go to stderr so that stdout carries only the summary
//! markup (or the prompt in dry-run mode) and can be piped.

use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::models::Paper;
use crate::pipeline::{SearchState, SourceCount};

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Source icons for the built-in sources.
pub fn source_icon(source: &str) -> &'static str {
    match source.to_lowercase().as_str() {
        "arxiv" => "📝",
        "pubmed" => "🏥",
        "crossref" => "🔗",
        _ => "📄",
    }
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    if !is_terminal() {
        eprintln!("{} {}", icon, msg);
        return;
    }
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    eprintln!();
    if is_terminal() {
        eprintln!("{}", format!("━━━ {} ━━━", title).bold().cyan());
    } else {
        eprintln!("━━━ {} ━━━", title);
    }
}

/// The per-source line, e.g. "12 results found in PubMed."
pub fn count_line(count: &SourceCount) -> String {
    format!("{} results found in {}.", count.count, count.source)
}

/// Print the per-source line with the source icon.
pub fn print_count(source: &str, count: usize) {
    let line = count_line(&SourceCount {
        source: source.to_string(),
        count,
    });
    let icon = source_icon(source);
    if is_terminal() {
        eprintln!("{} {}", icon, line.green());
    } else {
        eprintln!("{} {}", icon, line);
    }
}

/// Print the state label, e.g. "Summarizing..."
pub fn print_state(state: SearchState) {
    let status = match state {
        SearchState::Done => Status::Success,
        SearchState::Failed => Status::Error,
        SearchState::Idle => Status::Info,
        SearchState::Searching | SearchState::Summarizing => Status::Search,
    };
    print_status(status, state.label());
}

/// One-line paper listing used in dry runs.
pub fn paper_line(paper: &Paper) -> String {
    format!(
        "{} {} <{}>",
        source_icon(paper.source.id()),
        truncate_with_ellipsis(&paper.title, 80),
        paper.url
    )
}

/// Print a divider line.
pub fn print_divider() {
    if is_terminal() {
        eprintln!("{}", "─".repeat(80).dimmed());
    } else {
        eprintln!("{}", "─".repeat(80));
    }
}

/// Truncate text to at most `max_chars` characters.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    #[test]
    fn test_source_icon() {
        assert_eq!(source_icon("arxiv"), "📝");
        assert_eq!(source_icon("PubMed"), "🏥");
        assert_eq!(source_icon("crossref"), "🔗");
        assert_eq!(source_icon("unknown"), "📄");
    }

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Search), "🔍");
    }

    #[test]
    fn test_count_line() {
        let count = SourceCount {
            source: "PubMed".to_string(),
            count: 12,
        };
        assert_eq!(count_line(&count), "12 results found in PubMed.");
    }

    #[test]
    fn test_paper_line() {
        let paper = Paper::new(
            "Base editing".to_string(),
            "https://doi.org/10.1/x".to_string(),
            SourceType::CrossRef,
        );
        assert_eq!(paper_line(&paper), "🔗 Base editing <https://doi.org/10.1/x>");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
    }
}
