//! Route access decisions derived from session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected pages send anonymous visitors to `/login`, guest-only pages
//! (login, register) send signed-in users to `/spaces`, and admin pages
//! refuse non-admins. Nothing is decided while the session is still loading.

use crate::session::SessionSnapshot;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/spaces";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Any signed-in user.
    Protected,
    /// Only visitors without a session.
    GuestOnly,
    /// Signed-in users with the admin role.
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session restoration has not finished; show a spinner.
    Pending,
    Allow,
    Redirect(&'static str),
    Forbidden,
}

impl Guard {
    #[must_use]
    pub fn check(self, session: &SessionSnapshot) -> Access {
        if session.loading {
            return Access::Pending;
        }
        match (self, &session.user) {
            (Self::GuestOnly, Some(_)) => Access::Redirect(HOME_ROUTE),
            (Self::GuestOnly, None) => Access::Allow,
            (Self::Protected | Self::AdminOnly, None) => Access::Redirect(LOGIN_ROUTE),
            (Self::Protected, Some(_)) => Access::Allow,
            (Self::AdminOnly, Some(user)) if user.is_admin() => Access::Allow,
            (Self::AdminOnly, Some(_)) => Access::Forbidden,
        }
    }
}

/// True when a protected view should bounce to the login page.
#[must_use]
pub fn should_redirect_unauth(session: &SessionSnapshot) -> bool {
    Guard::Protected.check(session) == Access::Redirect(LOGIN_ROUTE)
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
