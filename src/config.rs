use std::env;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::slash::parse::ValueCasing;

pub const ENV_LISTEN_ADDR: &str = "SLASHOPS_LISTEN_ADDR";
pub const ENV_SLACK_TOKEN: &str = "SLASHOPS_SLACK_TOKEN";
pub const ENV_HELP_PATH: &str = "SLASHOPS_HELP_PATH";
pub const ENV_VALUE_CASING: &str = "SLASHOPS_VALUE_CASING";
pub const ENV_TRACKER_URL: &str = "SLASHOPS_TRACKER_URL";
pub const ENV_TRACKER_TOKEN: &str = "SLASHOPS_TRACKER_TOKEN";
pub const ENV_TRACKER_OWNER: &str = "SLASHOPS_TRACKER_OWNER";
pub const ENV_TRACKER_REPO: &str = "SLASHOPS_TRACKER_REPO";

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Shared token the chat platform sends with every invocation.
    #[serde(default)]
    pub slack_token: Option<String>,
    #[serde(default = "default_help_path")]
    pub help_path: String,
    #[serde(default)]
    pub value_casing: ValueCasing,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub default_owner: Option<String>,
    #[serde(default)]
    pub default_repo: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: default_listen_addr(),
            slack_token: None,
            help_path: default_help_path(),
            value_casing: ValueCasing::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            base_url: default_tracker_base_url(),
            token: None,
            default_owner: None,
            default_repo: None,
        }
    }
}

impl AppConfig {
    /// Reads the YAML config if present, then layers `SLASHOPS_*` variables
    /// on top. A missing file is fine; every field has a default or an env
    /// form.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_yaml_bw::from_str(&raw)
                .with_context(|| format!("parse config {}", path.display()))?
        } else {
            AppConfig::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(value) = env_value(ENV_LISTEN_ADDR) {
            self.listen_addr = value;
        }
        if let Some(value) = env_value(ENV_SLACK_TOKEN) {
            self.slack_token = Some(value);
        }
        if let Some(value) = env_value(ENV_HELP_PATH) {
            self.help_path = value;
        }
        if let Some(value) = env_value(ENV_VALUE_CASING) {
            match ValueCasing::parse(&value) {
                Some(casing) => self.value_casing = casing,
                None => tracing::warn!(
                    "{ENV_VALUE_CASING}={value} is not a casing policy, keeping {:?}",
                    self.value_casing
                ),
            }
        }
        if let Some(value) = env_value(ENV_TRACKER_URL) {
            self.tracker.base_url = value;
        }
        if let Some(value) = env_value(ENV_TRACKER_TOKEN) {
            self.tracker.token = Some(value);
        }
        if let Some(value) = env_value(ENV_TRACKER_OWNER) {
            self.tracker.default_owner = Some(value);
        }
        if let Some(value) = env_value(ENV_TRACKER_REPO) {
            self.tracker.default_repo = Some(value);
        }
    }

    /// Startup refuses to run without the two tokens nothing works without;
    /// everything else can wait until a command needs it.
    pub fn validate_for_serve(&self) -> Result<()> {
        if self.slack_token.as_deref().unwrap_or_default().is_empty() {
            bail!("no slack token configured (set slack_token or {ENV_SLACK_TOKEN})");
        }
        if self.tracker.token.as_deref().unwrap_or_default().is_empty() {
            bail!("no tracker token configured (set tracker.token or {ENV_TRACKER_TOKEN})");
        }
        Ok(())
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_help_path() -> String {
    "help.yaml".to_string()
}

fn default_tracker_base_url() -> String {
    "https://api.github.com".to_string()
}

fn env_value(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
