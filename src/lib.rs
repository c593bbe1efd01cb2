//! Deskbook: session-managed client for the coworking-space booking API.
//!
//! ARCHITECTURE
//! ============
//! - [`session`] owns identity, the token pair and `auth_fetch`.
//! - [`store`] and [`transport`] are the two seams the session depends on.
//! - [`guard`] turns a session snapshot into route access decisions.
//! - [`api`] holds typed resource clients that go through `auth_fetch`.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod store;
pub mod transport;

pub use api::ApiError;
pub use config::{ClientConfig, RefreshMode};
pub use error::{ErrorCode, FieldError, SessionError};
pub use session::types::{Role, User};
pub use session::{RequestOptions, SessionManager, SessionPhase, SessionSnapshot};
pub use store::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

#[cfg(test)]
#[path = "support_test.rs"]
pub(crate) mod support;
