//! Pre-navigation policy check.
//!
//! Pure: route metadata plus an auth snapshot in, a decision out. The
//! effectful half (lazy session fetch, recording the return target, moving
//! the location) lives in [`super::Router`].

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::{HOME_PATH, LOGIN_PATH, RouteMeta};
use crate::state::auth::{AuthPhase, AuthState};

/// The slice of auth state the guard reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthView {
    pub phase: AuthPhase,
    pub loading: bool,
    pub authenticated: bool,
    pub admin: bool,
}

impl From<&AuthState> for AuthView {
    fn from(state: &AuthState) -> Self {
        Self {
            phase: state.phase,
            loading: state.loading,
            authenticated: state.is_authenticated(),
            admin: state.is_admin(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect {
        to: &'static str,
        /// Full path to resume after login, when the redirect is a login bounce.
        return_url: Option<String>,
    },
}

/// Auth must be resolved first when nothing has been attempted yet.
#[must_use]
pub fn needs_session_fetch(auth: &AuthView) -> bool {
    auth.phase == AuthPhase::Unknown && !auth.loading
}

/// First failing check wins: login required, then admin, then guest-only.
#[must_use]
pub fn evaluate(meta: RouteMeta, full_path: &str, auth: &AuthView) -> GuardDecision {
    if meta.requires_auth && !auth.authenticated {
        return GuardDecision::Redirect { to: LOGIN_PATH, return_url: Some(full_path.to_owned()) };
    }
    if meta.requires_admin && !(auth.authenticated && auth.admin) {
        return GuardDecision::Redirect { to: HOME_PATH, return_url: None };
    }
    if meta.requires_guest && auth.authenticated {
        return GuardDecision::Redirect { to: HOME_PATH, return_url: None };
    }
    GuardDecision::Allow
}
