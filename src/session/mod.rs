//! Session manager: token lifecycle and the authenticated request primitive.
//!
//! ARCHITECTURE
//! ============
//! One `SessionManager` owns the signed-in identity for its lifetime and is
//! shared by handle (`Arc<SessionManager>`). Every resource call funnels
//! through [`SessionManager::auth_fetch`], which injects the bearer token and
//! transparently refreshes it once when it is missing or rejected.
//!
//! State transitions are published on a `watch` channel so consumers can
//! react to sign-in, sign-out and failed refreshes without polling.
//!
//! FAILURE SEMANTICS
//! =================
//! `initialize` and `refresh` never return errors: a failure there degrades
//! to "no session". `sign_in`, `sign_up`, `verify` and the requests issued by
//! `auth_fetch` return transport and auth errors to the caller.
//!
//! TRADE-OFFS
//! ==========
//! Concurrent refreshes are not de-duplicated unless `RefreshMode::SingleFlight`
//! is configured. In the default mode two racing callers may both hit
//! `/auth/refresh`; the last writer's tokens win.

pub mod types;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::config::{ClientConfig, RefreshMode};
use crate::error::SessionError;
use crate::store::{FileTokenStore, TokenPair, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use types::{ErrorBody, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, User};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const VERIFY_PATH: &str = "/auth/verify";

const AUTH_FAILED: &str = "authentication failed";
const INVALID_CREDENTIALS: &str = "invalid credentials";
const REGISTRATION_FAILED: &str = "registration failed";

// =============================================================================
// REQUEST OPTIONS
// =============================================================================

/// Caller-supplied request parts. The session adds the auth headers.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self { method, headers: HeaderMap::new(), query: Vec::new(), body: None }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serialize `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, SessionError> {
        let body = serde_json::to_vec(value).map_err(|e| SessionError::Decode(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Authenticated,
    Anonymous,
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    /// True until `initialize` has finished.
    pub loading: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (Some(_), _) => SessionPhase::Authenticated,
            (None, true) => SessionPhase::Initializing,
            (None, false) => SessionPhase::Anonymous,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionSnapshot>,
    /// Bumped by `sign_in` and `sign_out`; refreshes started in an older epoch are discarded.
    epoch: AtomicU64,
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot { user: None, loading: true });
        Self { config, transport, store, state, epoch: AtomicU64::new(0), refresh_gate: Mutex::new(()) }
    }

    /// Session backed by `reqwest` and a token file at `config.token_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, SessionError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        let store = Arc::new(FileTokenStore::open(config.token_file.clone()));
        Ok(Self::new(config, transport, store))
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// True iff the current user has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Tokens currently held by the store.
    #[must_use]
    pub fn tokens(&self) -> TokenPair {
        self.store.load()
    }

    // -------------------------------------------------------------------------
    // LIFECYCLE
    // -------------------------------------------------------------------------

    /// Restore the session from persisted tokens. Always clears `loading`.
    pub async fn initialize(&self) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut restored = None;

        if let Some(token) = self.store.access_token() {
            match self.verify(&token).await {
                Ok(user) => {
                    tracing::info!(user_id = user.id, "session restored");
                    restored = Some(user);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored access token rejected; clearing session");
                    if self.epoch.load(Ordering::SeqCst) == epoch {
                        self.store.clear();
                    }
                }
            }
        }

        let current = self.epoch.load(Ordering::SeqCst) == epoch;
        self.state.send_modify(|state| {
            if current {
                state.user = restored;
            }
            state.loading = false;
        });
    }

    /// Log in with email and password, installing the returned tokens and user.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Auth`] with the server message on a non-success status
    /// - [`SessionError::Transport`] if the request could not be sent
    /// - [`SessionError::Decode`] if the success body is malformed
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse, SessionError> {
        let options = RequestOptions::post().json(&LoginRequest { email, password })?;
        let response = self.send(LOGIN_PATH, &options, None).await?;

        if !response.is_success() {
            let message = ErrorBody::parse(&response.body)
                .message()
                .unwrap_or_else(|| INVALID_CREDENTIALS.to_owned());
            tracing::info!(status = response.status.as_u16(), "login rejected");
            return Err(SessionError::Auth(message));
        }

        let login: LoginResponse = response.json()?;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store
            .save(&TokenPair::new(login.access_token.clone(), login.refresh_token.clone()));
        let user = login.user.clone();
        tracing::info!(user_id = user.id, role = %user.role, "signed in");
        self.state.send_modify(|state| state.user = Some(user));
        Ok(login)
    }

    /// Register a new account. Does not sign in.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] with the server's field list on HTTP 422
    ///   (a 422 without a usable field list is reported like any other failure)
    /// - [`SessionError::Auth`] with the server message on other failures
    /// - [`SessionError::Transport`] / [`SessionError::Decode`] as for `sign_in`
    pub async fn sign_up<P: Serialize + ?Sized>(&self, profile: &P) -> Result<serde_json::Value, SessionError> {
        let options = RequestOptions::post().json(profile)?;
        let response = self.send(REGISTER_PATH, &options, None).await?;

        if !response.is_success() {
            let body = ErrorBody::parse(&response.body);
            if response.status == StatusCode::UNPROCESSABLE_ENTITY {
                let fields = body.field_errors();
                if !fields.is_empty() {
                    return Err(SessionError::Validation(fields));
                }
            }
            let message = body
                .message()
                .unwrap_or_else(|| REGISTRATION_FAILED.to_owned());
            return Err(SessionError::Auth(message));
        }

        response.json()
    }

    /// Drop the tokens and the user. No network call; safe to repeat.
    pub fn sign_out(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store.clear();
        self.state.send_if_modified(|state| state.user.take().is_some());
        tracing::debug!("signed out");
    }

    /// Check an access token against the backend and return its identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Auth`] on a non-success status, and transport or
    /// decode errors unchanged.
    pub async fn verify(&self, token: &str) -> Result<User, SessionError> {
        let response = self
            .send(VERIFY_PATH, &RequestOptions::get(), Some(token))
            .await?;
        if !response.is_success() {
            return Err(SessionError::Auth(format!("token verification failed: {}", response.status.as_u16())));
        }
        response.json()
    }

    // -------------------------------------------------------------------------
    // REFRESH
    // -------------------------------------------------------------------------

    /// Exchange the refresh token for a new pair. Returns the new access token,
    /// or `None` after purging the session if anything went wrong.
    pub async fn refresh(&self) -> Option<String> {
        let stale = self.store.access_token();
        self.refresh_replacing(stale.as_deref()).await
    }

    async fn refresh_replacing(&self, stale: Option<&str>) -> Option<String> {
        match self.config.refresh_mode {
            RefreshMode::Independent => self.refresh_now().await,
            RefreshMode::SingleFlight => {
                let _gate = self.refresh_gate.lock().await;
                let current = self.store.access_token();
                if current.is_some() && current.as_deref() != stale {
                    tracing::debug!("access token rotated while waiting; reusing it");
                    return current;
                }
                self.refresh_now().await
            }
        }
    }

    async fn refresh_now(&self) -> Option<String> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        match self.exchange_refresh_token().await {
            Ok(tokens) if self.epoch.load(Ordering::SeqCst) == epoch => {
                self.store.save(&tokens);
                tokens.access_token
            }
            Ok(_) => {
                tracing::debug!("session changed during refresh; discarding new tokens");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    self.purge();
                }
                None
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<TokenPair, SessionError> {
        let refresh_token = self
            .store
            .refresh_token()
            .ok_or_else(|| SessionError::Auth("no refresh token".into()))?;

        let options = RequestOptions::post().json(&RefreshRequest { refresh_token: &refresh_token })?;
        let response = self.send(REFRESH_PATH, &options, None).await?;
        if !response.is_success() {
            return Err(SessionError::Auth(format!("refresh rejected: {}", response.status.as_u16())));
        }

        let fresh: RefreshResponse = response.json()?;
        Ok(TokenPair {
            access_token: Some(fresh.access_token),
            refresh_token: Some(fresh.refresh_token.unwrap_or(refresh_token)),
        })
    }

    fn purge(&self) {
        self.store.clear();
        self.state.send_if_modified(|state| state.user.take().is_some());
    }

    // -------------------------------------------------------------------------
    // REQUESTS
    // -------------------------------------------------------------------------

    /// Send an authenticated request to `endpoint`, refreshing the token at most once.
    ///
    /// The response is returned whatever its status; only a missing or
    /// unrefreshable session is an error here.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Auth`] if no token could be obtained (nothing is sent)
    ///   or the refresh after a 401 failed
    /// - [`SessionError::Transport`] if a request could not be sent
    pub async fn auth_fetch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse, SessionError> {
        let token = match self.store.access_token() {
            Some(token) => token,
            None => {
                tracing::debug!(endpoint, "no access token; refreshing before request");
                self.refresh_replacing(None)
                    .await
                    .ok_or_else(|| SessionError::Auth(AUTH_FAILED.into()))?
            }
        };

        let response = self.send(endpoint, &options, Some(&token)).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(endpoint, "request unauthorized; refreshing and retrying once");
        let Some(fresh) = self.refresh_replacing(Some(&token)).await else {
            return Err(SessionError::Auth(AUTH_FAILED.into()));
        };
        self.send(endpoint, &options, Some(&fresh)).await
    }

    /// Send a request without credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the request could not be sent.
    pub async fn public_fetch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse, SessionError> {
        self.send(endpoint, &options, None).await
    }

    async fn send(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, SessionError> {
        let request = self.build_request(endpoint, options, bearer)?;
        let method = request.method.clone();
        self.transport.send(request).await.inspect_err(|e| {
            tracing::warn!(%method, endpoint, error = %e, "request failed");
        })
    }

    fn build_request(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<ApiRequest, SessionError> {
        let mut headers = options.headers.clone();
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SessionError::Auth("access token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut url = self.config.endpoint(endpoint);
        if !options.query.is_empty() {
            url = reqwest::Url::parse_with_params(&url, &options.query)
                .map_err(|e| SessionError::Config(format!("invalid URL {url}: {e}")))?
                .into();
        }

        Ok(ApiRequest { method: options.method.clone(), url, headers, body: options.body.clone() })
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
