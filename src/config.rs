//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$PHISHSIFT_CONFIG` (environment variable)
//! 2. `~/.config/phishsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\phishsift\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classify::{Triage, DEFAULT_MAILBOX, DEFAULT_THRESHOLD};
use crate::error::Result;
use crate::features::{FeaturePipeline, TextConcat};
use crate::parser::mbox::DEFAULT_MAX_MESSAGE_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Feature matrix settings.
    pub features: FeaturesConfig,
    /// Sequence-model text input.
    pub text: TextConfig,
    /// Remote mailbox triage.
    pub listener: ListenerConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Feature columns left out of the matrix.
    pub exclude: Vec<String>,
    /// Standardize every column.
    pub normalize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Field labels joined into the text input, in order.
    pub fields: Vec<String>,
    pub separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Mailboxes to scan for unseen messages.
    pub mailboxes: Vec<String>,
    /// Destination mailbox for phishy messages.
    pub spam_box: String,
    /// Probability at or above which a message is moved.
    pub phishy_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            exclude: [
                "X-Virus-Scanned",
                "Is JavaScript",
                "Attachments",
                "Message Length",
                "URL Unicode Ratio",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            normalize: true,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            fields: vec!["Subject".to_string(), "Extracted Text".to_string()],
            separator: "\n".to_string(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            mailboxes: vec![DEFAULT_MAILBOX.to_string()],
            spam_box: "Spam".to_string(),
            phishy_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Config {
    /// Feature pipeline described by `[features]`.
    pub fn feature_pipeline(&self) -> Result<FeaturePipeline> {
        FeaturePipeline::new(&self.features.exclude, self.features.normalize)
    }

    /// Text concatenation described by `[text]`.
    pub fn text_concat(&self) -> Result<TextConcat> {
        TextConcat::new(self.text.fields.clone(), self.text.separator.clone())
    }

    /// Triage described by `[text]`, `[features]` and `[listener]`.
    pub fn triage(&self) -> Result<Triage> {
        let triage = Triage::new(
            self.text_concat()?,
            self.feature_pipeline()?,
            self.listener.phishy_threshold,
            self.listener.spam_box.clone(),
        );
        Ok(triage.with_mailboxes(self.listener.mailboxes.clone()))
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("PHISHSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("phishsift").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phishsift")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("phishsift.log")
}
