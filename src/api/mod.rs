//! Typed resource clients for spaces, bookings and email verification.
//!
//! ERROR HANDLING
//! ==============
//! `auth_fetch` hands back every HTTP response untouched; this layer is the
//! caller that interprets statuses. Non-2xx bodies are mined for the
//! backend's `message` / `detail`, 422 field lists become
//! [`ApiError::Validation`], and admin-only calls are refused locally before
//! any request is sent.

pub mod bookings;
pub(crate) mod de;
pub mod email;
pub mod spaces;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, FieldError, SessionError};
use crate::session::SessionManager;
use crate::session::types::ErrorBody;
use crate::transport::ApiResponse;

const SNIPPET_CHARS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The operation needs the admin role and the current user lacks it.
    #[error("admin role required")]
    Forbidden,

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// The backend answered with something other than JSON, e.g. a proxy error page.
    #[error("expected JSON, got: {0}")]
    UnexpectedContent(String),

    #[error("response parse failed: {0}")]
    Decode(String),

    #[error("end time must be after start time")]
    InvalidRange,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Validation(_) => Some(StatusCode::UNPROCESSABLE_ENTITY.as_u16()),
            _ => None,
        }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.error_code(),
            Self::Forbidden => "E_FORBIDDEN",
            Self::Status { status: 404, .. } => "E_NOT_FOUND",
            Self::Status { .. } => "E_STATUS",
            Self::Validation(_) => "E_VALIDATION",
            Self::UnexpectedContent(_) => "E_UNEXPECTED_CONTENT",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidRange => "E_INVALID_RANGE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Session(e) => e.retryable(),
            Self::Status { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| match e.field() {
            Some(field) => format!("{field}: {}", e.msg),
            None => e.msg.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// RESPONSE HELPERS
// =============================================================================

pub(crate) fn require_admin(session: &SessionManager) -> Result<(), ApiError> {
    if session.is_admin() { Ok(()) } else { Err(ApiError::Forbidden) }
}

/// Turn a non-2xx response into an [`ApiError`], using `fallback` when the body has no message.
pub(crate) fn error_for(response: &ApiResponse, fallback: &str) -> ApiError {
    let body = ErrorBody::parse(&response.body);
    if response.status == StatusCode::UNPROCESSABLE_ENTITY {
        let fields = body.field_errors();
        if !fields.is_empty() {
            return ApiError::Validation(fields);
        }
    }
    ApiError::Status {
        status: response.status.as_u16(),
        message: body.message().unwrap_or_else(|| fallback.to_owned()),
    }
}

pub(crate) fn ensure_success(response: ApiResponse, fallback: &str) -> Result<ApiResponse, ApiError> {
    if response.is_success() { Ok(response) } else { Err(error_for(&response, fallback)) }
}

pub(crate) fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Reject non-JSON bodies with the first characters of what came back.
pub(crate) fn ensure_json(response: &ApiResponse) -> Result<(), ApiError> {
    if response.is_json() {
        return Ok(());
    }
    let snippet: String = response.text().chars().take(SNIPPET_CHARS).collect();
    Err(ApiError::UnexpectedContent(snippet))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
