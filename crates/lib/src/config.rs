//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.slackline/config.json`) and
//! environment. The slack section is read once at startup and immutable
//! afterward.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Slack adapter settings.
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Slack adapter config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Whether the adapter starts at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bot token. Overridden by SLACK_BOT_TOKEN env when set; prefer the env
    /// variable so the secret stays out of the config file.
    pub token: Option<String>,

    /// Which messages should be parsed as actions, in evaluation order. Each
    /// pattern's first capture group is the action name to try — e.g.
    /// `(?i)^action\s(\w*).*$` matches `action thing otherThing`, trying the
    /// action "thing".
    #[serde(default)]
    pub trigger_patterns: Vec<String>,

    /// How many received messages to keep in the in-memory history.
    #[serde(default = "default_messages_to_save")]
    pub messages_to_save: usize,

    /// Join this host chat room on connect so received messages are
    /// republished into it (None to skip).
    pub republish_room_name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_messages_to_save() -> usize {
    100
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            token: None,
            trigger_patterns: Vec::new(),
            messages_to_save: default_messages_to_save(),
            republish_room_name: None,
        }
    }
}

/// Resolve the Slack bot token: env SLACK_BOT_TOKEN overrides config.
pub fn resolve_slack_token(config: &Config) -> Option<String> {
    std::env::var("SLACK_BOT_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .slack
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SLACKLINE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".slackline").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or SLACKLINE_CONFIG_PATH). Missing file
/// => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
