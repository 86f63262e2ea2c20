//! Configuration loading for the mail relay
//!
//! Two pieces of configuration live here:
//! - [`GmailCredentials`]: OAuth client credentials, loaded from (in order)
//!   compile-time embedded values, the Google Cloud Console JSON file in the
//!   config directory, or runtime environment variables.
//! - [`RelayConfig`]: the relay settings file (chat token, channels, labels).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ChannelId;
use crate::relay::resolve_channel;

/// Credentials filename in the mailrelay config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Default relay settings filename in the mailrelay config directory
const RELAY_CONFIG_FILE: &str = "relay.json";

/// Default token store filename in the mailrelay config directory
const TOKEN_FILE: &str = "gmail-tokens.json";

/// Environment variable pointing at an alternative relay settings file
pub const CONFIG_PATH_ENV: &str = "MAILRELAY_CONFIG";

/// Environment variable overriding the chat token from the settings file
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/mailrelay/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Credentials embedded at build time via GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Desktop apps get "installed", web apps get "web"
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

/// How a label's messages are rendered into chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// JPEG attachments followed by the plain-text body
    #[default]
    Full,
    /// The subject line only
    SubjectOnly,
}

/// Validation failures for a relay configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no labels configured")]
    NoLabels,
    #[error("discord.default_channel_id is empty")]
    MissingDefaultChannel,
    #[error("discord.token is empty and DISCORD_TOKEN is not set")]
    MissingToken,
    #[error("discord.trigger_command is empty")]
    MissingTriggerCommand,
    #[error("poll_interval_secs must be greater than zero")]
    ZeroInterval,
    #[error("label {0:?} has an empty name")]
    EmptyLabelName(String),
    #[error("attachment_pattern is empty and would match every part")]
    EmptyAttachmentPattern,
}

/// Chat platform settings
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    #[serde(default)]
    pub token: String,
    pub default_channel_id: ChannelId,
    #[serde(default = "default_trigger_command")]
    pub trigger_command: String,
}

/// Gmail settings; paths are relative to the settings file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailSettings {
    pub credentials_file: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
}

/// One configured label, keyed by its internal label key
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSettings {
    /// Label name as shown in Gmail
    pub name: String,
    /// Overrides the default channel for this label
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub render: RenderMode,
    /// Whether the interval timer includes this label
    #[serde(default = "default_true")]
    pub poll: bool,
}

/// Immutable routing rule for one label, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRule {
    pub key: String,
    pub name: String,
    pub channel: ChannelId,
    pub render: RenderMode,
    pub poll: bool,
}

/// Relay settings file
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub discord: DiscordSettings,
    #[serde(default)]
    pub gmail: GmailSettings,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Substring an attachment filename must contain to be forwarded
    #[serde(default = "default_attachment_pattern")]
    pub attachment_pattern: String,
    pub labels: BTreeMap<String, LabelSettings>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_trigger_command() -> String {
    "!checkEmail".to_string()
}

fn default_poll_interval() -> u64 {
    300
}

fn default_attachment_pattern() -> String {
    ".jpg".to_string()
}

fn default_true() -> bool {
    true
}

impl RelayConfig {
    /// Load settings from `$MAILRELAY_CONFIG` or ~/.config/mailrelay/relay.json,
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => config::config_path(RELAY_CONFIG_FILE)
                .context("Could not determine config directory")?,
        };

        let mut relay = Self::from_file(&path)?;
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            relay.discord.token = token;
        }
        Ok(relay)
    }

    /// Load settings from a specific file without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut relay: Self = config::load_json_file(path)?;
        relay.base_dir = path.parent().map(Path::to_path_buf);
        Ok(relay)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse relay config JSON")
    }

    /// Check the settings are usable before anything connects
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.discord.default_channel_id.as_str().trim().is_empty() {
            return Err(ConfigError::MissingDefaultChannel);
        }
        if self.discord.trigger_command.is_empty() {
            return Err(ConfigError::MissingTriggerCommand);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.attachment_pattern.is_empty() {
            return Err(ConfigError::EmptyAttachmentPattern);
        }
        if self.labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }
        if let Some((key, _)) = self.labels.iter().find(|(_, l)| l.name.trim().is_empty()) {
            return Err(ConfigError::EmptyLabelName(key.clone()));
        }
        Ok(())
    }

    /// Interval between scheduled passes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Routing rules for every configured label, in label-key order
    pub fn label_rules(&self) -> Vec<LabelRule> {
        self.labels
            .iter()
            .map(|(key, label)| LabelRule {
                key: key.clone(),
                name: label.name.clone(),
                channel: resolve_channel(key, self),
                render: label.render,
                poll: label.poll,
            })
            .collect()
    }

    /// Gmail OAuth client credentials: the configured file if any,
    /// otherwise the [`GmailCredentials::load`] chain
    pub fn gmail_credentials(&self) -> Result<GmailCredentials> {
        match &self.gmail.credentials_file {
            Some(path) => GmailCredentials::from_file(&self.resolve(path)),
            None => GmailCredentials::load(),
        }
    }

    /// Where the Gmail token is persisted
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.gmail.token_file {
            Some(path) => Ok(self.resolve(path)),
            None => config::config_path(TOKEN_FILE).context("Could not determine config directory"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => config::resolve_relative(base, path),
            None => path.to_path_buf(),
        }
    }
}
