//! Configuration types for quote-stream

use crate::telemetry::LogFormat;
use crate::ws::ReconnectConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.token`
pub const TOKEN_ENV_VAR: &str = "QUOTE_STREAM_TOKEN";

/// Default snapshot endpoint
pub const DEFAULT_QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";

/// Default streaming endpoint
pub const DEFAULT_STREAM_URL: &str = "wss://ws.finnhub.io";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracked symbols, fixed for the process lifetime
    pub symbols: Vec<String>,
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Endpoints and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Auth token sent with every request and the stream handshake
    #[serde(default)]
    pub token: String,

    /// Snapshot endpoint queried once per symbol at startup
    #[serde(default = "default_quote_url")]
    pub quote_url: String,

    /// Streaming endpoint
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Per-request timeout for bootstrap (none = wait indefinitely)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_quote_url() -> String {
    DEFAULT_QUOTE_URL.to_string()
}
fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.to_string()
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Token with all but the last four characters hidden
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

/// Price store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Samples kept per symbol; oldest are dropped beyond this
    #[serde(default = "default_max_history_samples")]
    pub max_history_samples: usize,

    /// Pending mutation commands before producers wait
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Notifications retained for slow subscribers
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_history_samples() -> usize {
    20
}
fn default_command_buffer() -> usize {
    1024
}
fn default_event_buffer() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history_samples: 20,
            command_buffer: 1024,
            event_buffer: 256,
        }
    }
}

/// Streaming connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Keepalive ping interval (0 disables keepalive)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl StreamConfig {
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }
}

/// Reconnect-with-backoff settings for the stream supervisor
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Fraction of the delay randomized in either direction
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Attempts before giving up (0 = unlimited)
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_true() -> bool {
    true
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 0,
        }
    }
}

impl ReconnectSettings {
    pub fn policy_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter_factor: self.jitter_factor,
            max_attempts: self.max_attempts,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load, apply environment overrides and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse, apply environment overrides and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                self.api.token = token;
            }
        }
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("symbols must not be blank".into()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate symbol: {}",
                    symbol
                )));
            }
        }

        if self.api.token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "api.token is empty (set it in the config file or {})",
                TOKEN_ENV_VAR
            )));
        }

        for (name, url) in [
            ("api.quote_url", &self.api.quote_url),
            ("api.stream_url", &self.api.stream_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL: {}", name, e)))?;
        }

        if self.store.max_history_samples == 0 {
            return Err(ConfigError::Invalid(
                "store.max_history_samples must be at least 1".into(),
            ));
        }

        let reconnect = &self.stream.reconnect;
        if reconnect.multiplier < 1.0 || !reconnect.multiplier.is_finite() {
            return Err(ConfigError::Invalid(
                "stream.reconnect.multiplier must be >= 1.0".into(),
            ));
        }
        if reconnect.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "stream.reconnect.initial_delay_ms must be at least 1".into(),
            ));
        }
        if reconnect.initial_delay_ms > reconnect.max_delay_ms {
            return Err(ConfigError::Invalid(
                "stream.reconnect.initial_delay_ms must not exceed max_delay_ms".into(),
            ));
        }
        if !(0.0..1.0).contains(&reconnect.jitter_factor) {
            return Err(ConfigError::Invalid(
                "stream.reconnect.jitter_factor must be in [0, 1)".into(),
            ));
        }

        Ok(())
    }
}
