//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by the route guard and by the HTTP client (bearer tokens) to
//! coordinate login redirects and identity-dependent requests.
//!
//! STATE MACHINE
//! =============
//! `Unknown` (nothing attempted) moves through `loading` into either
//! `Authenticated(role)` or `Anonymous`. Every action clears the last error
//! on entry and always drops `loading` on exit. The flag is advisory: actions
//! do not lock each other out.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::net::http::TokenSource;
use crate::net::identity::IdentityBackend;
use crate::net::types::{Role, Session, User};
use crate::router::{HOME_PATH, LOGIN_PATH, Navigator};

pub const SIGN_UP_CONFIRM_NOTICE: &str = "Registration successful! Check your email to confirm your account.";
pub const SIGN_UP_PENDING_NOTICE: &str = "Registration is being processed. Follow any further instructions you receive.";

/// Whether a session lookup has settled yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Unknown,
    Anonymous,
    Authenticated,
}

/// Externally visible auth status, folding `loading` over the phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Loading,
    Anonymous,
    Authenticated(Role),
}

/// Role for `user`, or `None` when there is no user.
#[must_use]
pub fn derive_role(user: Option<&User>) -> Option<Role> {
    user.map(User::role)
}

#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub role: Option<Role>,
    pub phase: AuthPhase,
    pub loading: bool,
    pub error: Option<String>,
    /// Deep link captured by the guard, consumed by the next login.
    pub return_url: Option<String>,
    /// User-facing notice from the last sign-up.
    pub notice: Option<String>,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.user.is_some())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.session.as_ref()?.user.as_ref()?.email.as_deref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref()?.user.as_ref().map(|u| u.id.as_str())
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        if self.loading {
            return AuthStatus::Loading;
        }
        match (self.phase, &self.role) {
            (AuthPhase::Unknown, _) => AuthStatus::Unknown,
            (AuthPhase::Authenticated, Some(role)) if self.is_authenticated() => AuthStatus::Authenticated(role.clone()),
            _ => AuthStatus::Anonymous,
        }
    }

    /// Replace session and user together, recomputing role and phase.
    pub fn assign(&mut self, session: Option<Session>, user: Option<User>) {
        self.session = session;
        self.user = user;
        self.role = derive_role(self.session.as_ref().and_then(|s| s.user.as_ref()));
        self.phase = if self.is_authenticated() { AuthPhase::Authenticated } else { AuthPhase::Anonymous };
    }

    pub fn clear(&mut self) {
        self.assign(None, None);
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }
}

/// Outcome of [`SessionStore::sign_up`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// A session came back immediately.
    SignedIn,
    /// The backend sent a confirmation email; no session yet.
    ConfirmationRequired,
    /// Neither a session nor a confirmable user came back.
    Pending,
    Failed,
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    identity: Arc<dyn IdentityBackend>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthState>,
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityBackend>, navigator: Arc<dyn Navigator>) -> Self {
        Self { identity, navigator, state: RwLock::new(AuthState::default()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.read().clone()
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.read().status()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.read().is_admin()
    }

    #[must_use]
    pub fn return_url(&self) -> Option<String> {
        self.read().return_url.clone()
    }

    pub fn set_return_url(&self, url: Option<String>) {
        self.write().return_url = url;
    }

    /// Load the backend's current session.
    pub async fn fetch_session(&self) {
        self.write().begin();

        let result = self.identity.get_session().await;

        let mut state = self.write();
        match result {
            Ok(session) => {
                let user = session.as_ref().and_then(|s| s.user.clone());
                state.assign(session, user);
            }
            Err(e) => {
                tracing::error!(error = %e, "error fetching session");
                state.error = Some(e.to_string());
                state.clear();
            }
        }
        state.loading = false;
    }

    /// Password sign-in; on success navigates to the captured deep link or home.
    pub async fn login(&self, email: &str, password: &str) {
        self.write().begin();

        let result = self.identity.sign_in_with_password(email, password).await;

        let target = {
            let mut state = self.write();
            let target = match result {
                Ok(response) => {
                    if response.session.is_some() && response.user.is_some() {
                        state.assign(response.session, response.user);
                    }
                    Some(state.return_url.take().unwrap_or_else(|| HOME_PATH.to_owned()))
                }
                Err(e) => {
                    tracing::error!(error = %e, "login error");
                    state.error = Some(e.to_string());
                    state.clear();
                    None
                }
            };
            state.loading = false;
            target
        };

        if let Some(target) = target {
            tracing::info!(%target, "login succeeded");
            self.navigator.push(&target).await;
        }
    }

    /// Register a new account. The backend may require email confirmation
    /// before issuing a session.
    pub async fn sign_up(&self, email: &str, password: &str) -> SignUpOutcome {
        self.write().begin();

        let result = self.identity.sign_up(email, password).await;

        let (outcome, target) = {
            let mut state = self.write();
            let decided = match result {
                Ok(response) => {
                    let outcome = match (&response.session, &response.user) {
                        (Some(_), _) => SignUpOutcome::SignedIn,
                        (None, Some(user)) if user.has_identities() => SignUpOutcome::ConfirmationRequired,
                        _ => SignUpOutcome::Pending,
                    };
                    state.assign(response.session, response.user);
                    state.notice = match outcome {
                        SignUpOutcome::ConfirmationRequired => Some(SIGN_UP_CONFIRM_NOTICE.to_owned()),
                        SignUpOutcome::Pending => Some(SIGN_UP_PENDING_NOTICE.to_owned()),
                        _ => None,
                    };
                    let target = if outcome == SignUpOutcome::SignedIn { HOME_PATH } else { LOGIN_PATH };
                    (outcome, Some(target))
                }
                Err(e) => {
                    tracing::error!(error = %e, "sign up error");
                    state.error = Some(e.to_string());
                    (SignUpOutcome::Failed, None)
                }
            };
            state.loading = false;
            decided
        };

        if let Some(target) = target {
            self.navigator.push(target).await;
        }
        outcome
    }

    /// Sign out remotely and locally. Local state is cleared even when the
    /// backend call fails.
    pub async fn logout(&self) {
        self.write().begin();

        let result = self.identity.sign_out().await;

        {
            let mut state = self.write();
            if let Err(e) = result {
                tracing::error!(error = %e, "logout error");
                state.error = Some(e.to_string());
            }
            state.clear();
            state.loading = false;
        }

        self.navigator.push(LOGIN_PATH).await;
    }
}

impl TokenSource for SessionStore {
    fn access_token(&self) -> Option<String> {
        self.read().session.as_ref().map(|s| s.access_token.clone())
    }
}
