//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLBOX_CONFIG` (environment variable)
//! 2. `~/.config/emlbox/config.toml` (Linux/macOS)
//!    `%APPDATA%\emlbox\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::mailbox::DEFAULT_EXTENSION;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mailbox directory settings.
    pub mailbox: MailboxConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory holding `emlbox.log`.
    pub log_dir: Option<PathBuf>,
}

/// Mailbox directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Mailbox directory used when none is given on the command line.
    pub dir: Option<PathBuf>,
    /// File extension of tracked messages, without the dot. Case-sensitive.
    pub extension: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load the configuration from [`config_file_path`], or the defaults.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load the configuration from `path`.
///
/// An unreadable or malformed file is logged and replaced by the defaults.
pub fn load_config_from(path: &Path) -> Config {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| toml::from_str::<Config>(&contents).map_err(|e| e.to_string()));

    match parsed {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Ignoring config file, using defaults");
            Config::default()
        }
    }
}

/// Write the configuration to [`config_file_path`], creating its directory.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("No config directory on this platform"))?;
    save_config_to(config, &path)
}

/// Write the configuration as pretty TOML to `path`.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMLBOX_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("emlbox").join("config.toml"))
}

/// Return the directory for log files.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emlbox")
}
