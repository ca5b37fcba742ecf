//! Settings for timeouts, retention, and prompt patterns.
//!
//! Loaded from `~/.aerie/config.toml`; every field has a default so a
//! missing or partial file still yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables supplied by the embedding application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// How long to wait for a prompt after sending a command
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// TCP connect + handshake deadline
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Channel poll granularity for the read loop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Deadline for the post-connect OS probe; expiry leaves the OS unknown
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Ledger rows unused for this many days are purged by `cleanup`
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Upper bound on the output snippet stored in a ledger context
    #[serde(default = "default_context_snippet_chars")]
    pub context_snippet_chars: usize,

    /// Default number of ranked suggestions returned
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    /// Override for the prompt-detection regex, for non-standard shells
    /// (e.g. Cisco `>`/`#` prompts). When unset, a pattern is built from
    /// the session's username and hostname.
    #[serde(default)]
    pub prompt_pattern: Option<String>,

    /// Ledger database location; defaults to `~/.aerie/ledger.db`
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_retention_days() -> i64 {
    30
}

fn default_context_snippet_chars() -> usize {
    100
}

fn default_suggestion_limit() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
            retention_days: default_retention_days(),
            context_snippet_chars: default_context_snippet_chars(),
            suggestion_limit: default_suggestion_limit(),
            prompt_pattern: None,
            ledger_path: None,
        }
    }
}

impl Settings {
    /// Global config directory (`~/.aerie`)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aerie")
    }

    /// Default config file location
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Resolved ledger database path
    pub fn ledger_db_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("ledger.db"))
    }

    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Write settings to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_to_partial_config() {
        let settings: Settings = toml::from_str("command_timeout_secs = 5").unwrap();
        assert_eq!(settings.command_timeout_secs, 5);
        assert_eq!(settings.poll_interval_ms, 50);
        assert_eq!(settings.retention_days, 30);
        assert!(settings.prompt_pattern.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.command_timeout_secs = 12;
        settings.prompt_pattern = Some(r"\S+[>#] ?$".to_string());
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.command_timeout_secs, 12);
        assert_eq!(loaded.prompt_pattern.as_deref(), Some(r"\S+[>#] ?$"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings.command_timeout_secs, 30);
    }
}
