//! Route gating for protected screens.
//!
//! The gate is a pure function of the session snapshot. Callers evaluate it
//! on every navigation into a protected area and never cache the answer,
//! since a logout from any screen has to lock protected content at once.

use super::SessionState;

/// What the presentation layer should do with a protected route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allow,
    RedirectToLogin,
}

/// Allow only a session that is positively authenticated.
pub fn gate(state: &SessionState) -> Gate {
    if state.authenticated() == Some(true) {
        Gate::Allow
    } else {
        Gate::RedirectToLogin
    }
}
