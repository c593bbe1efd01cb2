use reqwest::StatusCode;
use serde_json::json;

use super::*;
use crate::store::TokenPair;
use crate::support::{FakeBackend, bearer_of, json, path_of, session};
use crate::transport::ApiResponse;

#[tokio::test]
async fn token_in_body_means_verified() {
    let backend = FakeBackend::new(|_| json(200, json!({ "token": "abc", "message": "ok" })));
    let session = session(&backend, TokenPair::new("T1", "R1"));

    assert_eq!(verify_email(&session, "link-token").await.unwrap(), EmailVerification::Verified);

    let sent = &backend.requests()[0];
    assert_eq!(path_of(sent), "/api/verify-email");
    assert!(sent.url.ends_with("?token=link-token"));
    assert_eq!(bearer_of(sent), None);
}

#[tokio::test]
async fn missing_or_empty_token_is_rejected() {
    let backend = FakeBackend::new(|r| {
        if r.url.contains("empty") {
            json(200, json!({ "token": "" }))
        } else {
            json(400, json!({ "detail": "invalid or expired token" }))
        }
    });
    let session = session(&backend, TokenPair::default());

    assert_eq!(verify_email(&session, "stale").await.unwrap(), EmailVerification::Rejected);
    assert_eq!(verify_email(&session, "empty").await.unwrap(), EmailVerification::Rejected);
}

#[tokio::test]
async fn non_json_body_is_an_error() {
    let backend = FakeBackend::new(|_| Ok(ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "oops")));
    let session = session(&backend, TokenPair::default());

    assert!(matches!(verify_email(&session, "x").await, Err(ApiError::Decode(_))));
}

#[test]
fn truthiness_follows_json_semantics() {
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(false)));
    assert!(!is_truthy(&json!(0)));
    assert!(is_truthy(&json!(1)));
    assert!(is_truthy(&json!({})));
}
