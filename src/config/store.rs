//! Save-on-change settings file.

use std::path::{Path, PathBuf};

use super::{Settings, SettingsError};
use crate::pipeline::DEFAULT_PROMPT;

/// The settings file as stored on disk
///
/// Only file contents are read and written here; environment overrides are
/// never persisted. Every change is written immediately.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Open the file at `path`, starting from defaults when it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| SettingsError::Io(e.to_string()))?;
            toml::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))?
        } else {
            Settings::default()
        };

        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Write the current settings, creating the parent directory if needed
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Change one setting and save if it changed
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, SettingsError> {
        let changed = self.settings.set(key, value)?;
        if changed {
            self.save()?;
        }
        Ok(changed)
    }

    /// Restore the built-in prompt template and save
    pub fn reset_prompt(&mut self) -> Result<(), SettingsError> {
        self.settings.prompt_template = DEFAULT_PROMPT.to_string();
        self.save()
    }
}
