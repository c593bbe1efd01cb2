//! Persisted access/refresh token pair.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager is the only writer. Both tokens are always saved
//! together and cleared together, under the fixed keys `access_token` and
//! `refresh_token`.
//!
//! ERROR HANDLING
//! ==============
//! Store operations are infallible at the trait boundary. A file store that
//! fails to write logs the failure and keeps serving its in-memory copy, so
//! a broken disk degrades to a session that does not survive restart.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// The two bearer tokens issued by the backend. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: Some(access_token.into()), refresh_token: Some(refresh_token.into()) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Durable key/value storage for the token pair.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> TokenPair;

    fn save(&self, tokens: &TokenPair);

    fn clear(&self);

    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Tokens vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<TokenPair>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self { inner: Mutex::new(tokens) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> TokenPair {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn save(&self, tokens: &TokenPair) {
        *self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = tokens.clone();
    }

    fn clear(&self) {
        self.save(&TokenPair::default());
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON-file store: `{"access_token": "...", "refresh_token": "..."}`.
///
/// The file is read once at construction; afterwards the in-memory copy is
/// authoritative and every mutation is written through.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cache: MemoryTokenStore,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tokens = read_tokens(&path);
        Self { path, cache: MemoryTokenStore::with_tokens(tokens) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, tokens: &TokenPair) {
        let result = if tokens.is_empty() {
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        } else {
            serde_json::to_vec_pretty(tokens)
                .map_err(std::io::Error::other)
                .and_then(|raw| std::fs::write(&self.path, raw))
        };
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "token store write failed");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> TokenPair {
        self.cache.load()
    }

    fn save(&self, tokens: &TokenPair) {
        self.cache.save(tokens);
        self.persist(tokens);
    }

    fn clear(&self) {
        self.cache.clear();
        self.persist(&TokenPair::default());
    }
}

fn read_tokens(path: &Path) -> TokenPair {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TokenPair::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "token store read failed");
            return TokenPair::default();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "token store is not valid JSON; starting empty");
            TokenPair::default()
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
