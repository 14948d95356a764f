//! Persisted settings.
//!
//! Settings live in a TOML file (by default
//! `<config_dir>/research-digest/settings.toml`) and can be overridden with
//! `RESEARCH_DIGEST_*` environment variables, e.g. `RESEARCH_DIGEST_DAYS=7`
//! or `RESEARCH_DIGEST_SOURCES__ARXIV=false`. When no API key is configured,
//! `OPENAI_API_KEY` is used.

mod store;

pub use store::SettingsStore;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_DAYS;
use crate::pipeline::{DEFAULT_MODEL, DEFAULT_PROMPT};
use crate::sources::SourceSelection;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "RESEARCH_DIGEST";

/// Fallback environment variable for the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const APP_DIR: &str = "research-digest";
const SETTINGS_FILE: &str = "settings.toml";

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Credential for the chat-completion endpoint
    pub api_key: String,

    /// Last searched topic
    pub topic: String,

    /// Recency window in days
    pub days: u32,

    /// Enabled sources
    pub sources: SourceSelection,

    /// Restrict PubMed to review articles
    pub reviews_only: bool,

    /// Chat model
    pub model: String,

    /// System prompt template with a `{{topic}}` placeholder
    pub prompt_template: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            topic: String::new(),
            days: DEFAULT_DAYS,
            sources: SourceSelection::all(),
            reviews_only: true,
            model: DEFAULT_MODEL.to_string(),
            prompt_template: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set`]
    pub const KEYS: &'static [&'static str] = &[
        "api_key",
        "topic",
        "days",
        "sources.pubmed",
        "sources.crossref",
        "sources.arxiv",
        "reviews_only",
        "model",
        "prompt_template",
    ];

    /// Load the file at `path` (missing is fine) layered with environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let builder = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if settings.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                tracing::debug!("using API key from {}", API_KEY_ENV);
                settings.api_key = key;
            }
        }

        Ok(settings)
    }

    /// Apply one key-value change. Returns whether anything changed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, SettingsError> {
        let before = self.clone();

        match key {
            "api_key" => self.api_key = value.trim().to_string(),
            "topic" => self.topic = value.to_string(),
            "days" => self.days = parse_value(key, value)?,
            "sources.pubmed" => self.sources.pubmed = parse_value(key, value)?,
            "sources.crossref" => self.sources.crossref = parse_value(key, value)?,
            "sources.arxiv" => self.sources.arxiv = parse_value(key, value)?,
            "reviews_only" => self.reviews_only = parse_value(key, value)?,
            "model" => self.model = value.trim().to_string(),
            "prompt_template" => self.prompt_template = value.to_string(),
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }

        Ok(*self != before)
    }

    /// Copy safe to print, with the API key masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = mask_key(&self.api_key);
        copy
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        String::new()
    } else if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", chars[..3].iter().collect::<String>(), tail)
    }
}

/// Default settings file location
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

impl From<config::ConfigError> for SettingsError {
    fn from(err: config::ConfigError) -> Self {
        SettingsError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.days, 30);
        assert!(settings.reviews_only);
        assert_eq!(settings.sources, SourceSelection::all());
        assert_eq!(settings.model, "gpt-4o-mini");
        assert!(settings.prompt_template.contains("{{topic}}"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings.days, 30);
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
topic = "CAR-T"
days = 14

[sources]
arxiv = false
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.topic, "CAR-T");
        assert_eq!(settings.days, 14);
        assert!(settings.sources.pubmed);
        assert!(!settings.sources.arxiv);
        assert!(settings.reviews_only);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "days = = 3").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_set() {
        let mut settings = Settings::default();

        assert!(settings.set("days", "7").unwrap());
        assert!(!settings.set("days", "7").unwrap());
        assert!(settings.set("sources.crossref", "false").unwrap());
        assert_eq!(settings.days, 7);
        assert!(!settings.sources.crossref);

        assert!(matches!(
            settings.set("days", "soon"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings.set("engine", "x"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_redacted() {
        let mut settings = Settings::default();
        settings.api_key = "sk-abcdefghijklmnop".to_string();
        assert_eq!(settings.redacted().api_key, "sk-...mnop");

        settings.api_key = "short".to_string();
        assert_eq!(settings.redacted().api_key, "*****");
    }
}
