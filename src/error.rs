//! Error types shared by the session core and its consumers.
//!
//! DESIGN
//! ======
//! `SessionError` is the only error the session layer returns. Validation
//! failures keep the backend's per-field `detail` entries intact so callers
//! can attach each message to the input that caused it.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable machine-readable codes for errors surfaced to callers.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// One entry of a backend validation `detail` list.
///
/// `loc` is the path to the offending input, e.g. `["body", "password"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    #[serde(default)]
    pub msg: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FieldError {
    /// Name of the input this entry refers to: the last string in `loc`.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.loc.iter().rev().find_map(serde_json::Value::as_str)
    }
}

/// Group validation entries by field name. Entries without a field land under `""`.
#[must_use]
pub fn errors_by_field(errors: &[FieldError]) -> std::collections::BTreeMap<String, Vec<String>> {
    let mut out: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for err in errors {
        let key = err.field().unwrap_or_default().to_owned();
        out.entry(key).or_default().push(err.msg.clone());
    }
    out
}

// =============================================================================
// SESSION ERROR
// =============================================================================

/// Errors produced by session and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed or could not be established.
    #[error("{0}")]
    Auth(String),

    /// The backend rejected the submitted fields.
    #[error("validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),

    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Transport(String),

    /// A response body did not have the expected shape.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// A configuration value was missing or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "E_AUTH",
            Self::Validation(_) => "E_VALIDATION",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Decode(_) => "E_DECODE",
            Self::Config(_) => "E_CONFIG",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
