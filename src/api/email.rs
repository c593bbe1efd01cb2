//! Email confirmation links.

use serde_json::Value;

use super::{ApiError, decode};
use crate::session::{RequestOptions, SessionManager};

pub const VERIFY_EMAIL_PATH: &str = "/api/verify-email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailVerification {
    Verified,
    /// Invalid or expired token.
    Rejected,
}

/// Confirm an account using the token from the verification email. Sent
/// without credentials; the outcome depends only on the body carrying a token.
///
/// # Errors
///
/// Transport errors, and [`ApiError::Decode`] when the body is not JSON.
pub async fn verify_email(session: &SessionManager, token: &str) -> Result<EmailVerification, ApiError> {
    let options = RequestOptions::get().query("token", token);
    let response = session.public_fetch(VERIFY_EMAIL_PATH, options).await?;
    let body: Value = decode(&response)?;

    let outcome = if body.get("token").is_some_and(is_truthy) {
        EmailVerification::Verified
    } else {
        EmailVerification::Rejected
    };
    tracing::info!(status = response.status.as_u16(), ?outcome, "email verification");
    Ok(outcome)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "email_test.rs"]
mod tests;
