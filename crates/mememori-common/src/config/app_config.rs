//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use chrono::{FixedOffset, Offset, Utc};
use mememori_core::UserId;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub backend: BackendConfig,
    pub realtime: RealtimeConfig,
    pub chat: ChatSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// REST backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL every endpoint path is appended to
    pub api_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Realtime channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    pub url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_realtime_buffer")]
    pub buffer: usize,
}

/// Chat behaviour settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// Signed-in user; only the interactive shell requires it
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Offset used to decide the local calendar day and clock labels
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

impl ChatSettings {
    /// Local calendar offset; out-of-range values fall back to UTC
    #[must_use]
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    #[must_use]
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn require_user(&self) -> Result<UserId, ConfigError> {
        self.user_id.ok_or(ConfigError::MissingVar("CHAT_USER_ID"))
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            user_id: None,
            utc_offset_minutes: default_utc_offset_minutes(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "mememori-chat".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_realtime_buffer() -> usize {
    256
}

fn default_utc_offset_minutes() -> i32 {
    540 // Asia/Tokyo
}

fn default_long_press_ms() -> u64 {
    600
}

/// Derive the WebSocket endpoint from the REST base URL
fn derive_realtime_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/ws")
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default()),
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("CHAT_API_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CHAT_API_URL"))?;
        let api_url = api_url.trim().trim_end_matches('/').to_string();

        let env = match lookup("APP_ENV") {
            Some(raw) => Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?,
            None => default_env(),
        };

        let user_id = match lookup("CHAT_USER_ID") {
            Some(raw) => Some(
                UserId::parse(&raw).map_err(|_| ConfigError::InvalidValue("CHAT_USER_ID", raw))?,
            ),
            None => None,
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            realtime: RealtimeConfig {
                url: lookup("CHAT_REALTIME_URL").unwrap_or_else(|| derive_realtime_url(&api_url)),
                reconnect_delay_ms: parse_var(
                    &lookup,
                    "CHAT_REALTIME_RECONNECT_MS",
                    default_reconnect_delay_ms,
                )?,
                buffer: parse_var(&lookup, "CHAT_REALTIME_BUFFER", default_realtime_buffer)?,
            },
            backend: BackendConfig {
                timeout_secs: parse_var(&lookup, "CHAT_HTTP_TIMEOUT_SECS", default_http_timeout_secs)?,
                api_url,
            },
            chat: ChatSettings {
                user_id,
                utc_offset_minutes: parse_var(
                    &lookup,
                    "CHAT_UTC_OFFSET_MINUTES",
                    default_utc_offset_minutes,
                )?,
                long_press_ms: parse_var(&lookup, "CHAT_LONG_PRESS_MS", default_long_press_ms)?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
