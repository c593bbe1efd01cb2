//! HTTP transport seam.
//!
//! DESIGN
//! ======
//! The session manager never talks to `reqwest` directly; it hands fully
//! built [`ApiRequest`]s to a [`Transport`]. Production code uses
//! [`ReqwestTransport`], tests substitute a scripted implementation.
//! Responses are buffered so a caller can inspect the status, headers and
//! body without holding a connection.

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::SessionError;

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    /// JSON response with a matching `Content-Type`. Used by fakes and tests.
    #[must_use]
    pub fn json_body(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, reqwest::header::HeaderValue::from_static("application/json"));
        Self { status, headers, body: value.to_string().into_bytes() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// Body as UTF-8 text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        serde_json::from_slice(&self.body).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// Sends requests to the backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and buffer the full response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when no HTTP response was received.
    /// Non-2xx statuses are not errors at this layer.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honoring the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, SessionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeouts.request() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.timeouts.connect() {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?
            .to_vec();

        Ok(ApiResponse { status, headers, body })
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
