//! Gateway configuration
//!
//! Configuration is read from the environment once at process start and
//! passed explicitly to the store, backend and gateway constructors.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::error::{GatewayError, GatewayResult};

/// Default AskYourDatabase API base URL
pub const DEFAULT_BASE_URL: &str = "https://www.askyourdatabase.com";

/// Default maximum characters per outbound chat message
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4000;

/// Default bounded wait for every backend call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default lifetime of a backend session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Default session store location
pub const DEFAULT_SESSIONS_FILE: &str = "ayd_sessions.csv";

/// Configuration for the relay
///
/// ```ignore
/// let config = GatewayConfig::from_env()?
///     .with_max_message_chars(1600)
///     .with_request_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend API key (used only for session creation)
    pub api_key: String,

    /// Chatbot id the questions are routed to
    pub bot_id: String,

    /// Backend base URL
    pub base_url: String,

    /// Hard ceiling on the length (in characters) of a returned answer
    pub max_message_chars: usize,

    /// Upper bound on every outbound backend call
    pub request_timeout: Duration,

    /// How long a freshly created session is considered valid
    pub session_ttl: Duration,

    /// Path of the CSV session store
    pub sessions_file: PathBuf,
}

impl GatewayConfig {
    /// Create a configuration with explicit credentials and defaults elsewhere
    pub fn new(api_key: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            bot_id: bot_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_ttl: DEFAULT_SESSION_TTL,
            sessions_file: PathBuf::from(DEFAULT_SESSIONS_FILE),
        }
    }

    /// Create a configuration from environment variables
    ///
    /// Reads from:
    /// - `ASKYOURDATABASE_API_KEY` (required)
    /// - `ASKYOURDATABASE_CHAT_ID` (required)
    /// - `AYD_BASE_URL` (optional)
    /// - `MAX_SMS_CHARS` (optional, defaults to 4000)
    /// - `AYD_SESSIONS_FILE` (optional, defaults to `ayd_sessions.csv`)
    /// - `AYD_REQUEST_TIMEOUT_SECS` (optional, defaults to 60)
    /// - `AYD_SESSION_TTL_DAYS` (optional, defaults to 7)
    pub fn from_env() -> Result<Self> {
        tracing::info!("Loading gateway configuration from environment");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ASKYOURDATABASE_API_KEY")
            .context("ASKYOURDATABASE_API_KEY environment variable not set")?;
        let bot_id = lookup("ASKYOURDATABASE_CHAT_ID")
            .context("ASKYOURDATABASE_CHAT_ID environment variable not set")?;

        let mut config = Self::new(api_key, bot_id);

        if let Some(base_url) = lookup("AYD_BASE_URL").filter(|s| !s.trim().is_empty()) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("MAX_SMS_CHARS") {
            config.max_message_chars = raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_SMS_CHARS is not a number: {}", raw))?;
        }

        if let Some(raw) = lookup("AYD_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("AYD_REQUEST_TIMEOUT_SECS is not a number: {}", raw))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("AYD_SESSION_TTL_DAYS") {
            let days: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("AYD_SESSION_TTL_DAYS is not a number: {}", raw))?;
            let secs = days
                .checked_mul(24 * 3600)
                .with_context(|| format!("AYD_SESSION_TTL_DAYS is too large: {}", raw))?;
            config.session_ttl = Duration::from_secs(secs);
        }

        if let Some(path) = lookup("AYD_SESSIONS_FILE").filter(|s| !s.trim().is_empty()) {
            config.sessions_file = PathBuf::from(path);
        }

        config.validate()?;

        tracing::info!("Backend: {}", config.base_url);
        tracing::info!("Max message chars: {}", config.max_message_chars);
        tracing::info!("Request timeout: {:?}", config.request_timeout);
        tracing::info!("Session store: {}", config.sessions_file.display());

        Ok(config)
    }

    /// Set the backend base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the maximum answer length in characters
    pub fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }

    /// Set the per-call timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the session lifetime
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the session store path
    pub fn with_sessions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sessions_file = path.into();
        self
    }

    /// Reject configurations the gateway cannot run with
    pub fn validate(&self) -> GatewayResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::invalid_config("API key is empty"));
        }
        if self.bot_id.trim().is_empty() {
            return Err(GatewayError::invalid_config("chat id is empty"));
        }
        if self.max_message_chars == 0 {
            return Err(GatewayError::invalid_config(
                "maximum message length must be positive",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(GatewayError::invalid_config("request timeout must be positive"));
        }
        Ok(())
    }
}
