//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SessionError;

pub const DEFAULT_TOKEN_FILE: &str = ".deskbook-tokens.json";

/// How concurrent token refreshes are coordinated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Every caller that needs a token refreshes on its own; last writer wins.
    #[default]
    Independent,
    /// Refreshes are serialized; waiters reuse a token rotated while they waited.
    SingleFlight,
}

/// Optional transport timeouts. `None` leaves the HTTP client default in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientTimeouts {
    pub request_secs: Option<u64>,
    pub connect_secs: Option<u64>,
}

impl ClientTimeouts {
    #[must_use]
    pub fn request(&self) -> Option<Duration> {
        self.request_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Option<Duration> {
        self.connect_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeouts: ClientTimeouts,
    pub refresh_mode: RefreshMode,
    pub token_file: PathBuf,
}

impl ClientConfig {
    /// Config pointing at `api_base_url` with every other setting at its default.
    #[must_use]
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url),
            timeouts: ClientTimeouts::default(),
            refresh_mode: RefreshMode::default(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `DESKBOOK_API_URL`
    ///
    /// Optional:
    /// - `DESKBOOK_REQUEST_TIMEOUT_SECS`, `DESKBOOK_CONNECT_TIMEOUT_SECS`: unset means no limit
    /// - `DESKBOOK_REFRESH_MODE`: `independent` (default) or `single_flight`
    /// - `DESKBOOK_TOKEN_FILE`: default `.deskbook-tokens.json`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the base URL is missing or a value does not parse.
    pub fn from_env() -> Result<Self, SessionError> {
        let api_base_url = std::env::var("DESKBOOK_API_URL")
            .map_err(|_| SessionError::Config("DESKBOOK_API_URL not set".into()))?;
        Self::from_env_for(&api_base_url)
    }

    /// Like [`ClientConfig::from_env`], but with the base URL supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if an optional value does not parse.
    pub fn from_env_for(api_base_url: &str) -> Result<Self, SessionError> {
        let mut config = Self::new(api_base_url);

        config.timeouts = ClientTimeouts {
            request_secs: env_parse_u64("DESKBOOK_REQUEST_TIMEOUT_SECS")?,
            connect_secs: env_parse_u64("DESKBOOK_CONNECT_TIMEOUT_SECS")?,
        };
        config.refresh_mode = parse_refresh_mode(std::env::var("DESKBOOK_REFRESH_MODE").ok().as_deref())?;
        if let Ok(path) = std::env::var("DESKBOOK_TOKEN_FILE") {
            config.token_file = PathBuf::from(path);
        }
        Ok(config)
    }

    /// Absolute URL for a backend path such as `/auth/login`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.api_base_url)
        } else {
            format!("{}/{path}", self.api_base_url)
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_parse_u64(key: &str) -> Result<Option<u64>, SessionError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SessionError::Config(format!("{key} must be a whole number of seconds, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}

pub(crate) fn parse_refresh_mode(raw: Option<&str>) -> Result<RefreshMode, SessionError> {
    match raw.unwrap_or("independent") {
        "independent" => Ok(RefreshMode::Independent),
        "single_flight" => Ok(RefreshMode::SingleFlight),
        other => Err(SessionError::Config(format!(
            "unsupported refresh mode '{other}' (expected 'independent' or 'single_flight')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
