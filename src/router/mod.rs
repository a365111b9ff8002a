//! Client-side route table and guarded navigation.
//!
//! DESIGN
//! ======
//! Route declarations are static data. [`guard::evaluate`] decides; the
//! [`Router`] performs the effects: lazily resolving the session, stashing
//! the post-login return target, following redirects and committing the
//! final location.

pub mod guard;


use std::sync::{Arc, OnceLock, RwLock, Weak};

use guard::{AuthView, GuardDecision};

use crate::state::auth::{AuthPhase, SessionStore};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const ADMIN_CREATE_COMIC_PATH: &str = "/admin/comics/create";

/// Guard hops followed before giving up on a navigation.
pub const MAX_REDIRECTS: usize = 4;

// =============================================================================
// ROUTE TABLE
// =============================================================================

/// Static access flags attached to a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub requires_guest: bool,
}

impl RouteMeta {
    pub const OPEN: Self = Self { requires_auth: false, requires_admin: false, requires_guest: false };
    pub const GUEST: Self = Self { requires_auth: false, requires_admin: false, requires_guest: true };
    pub const ADMIN: Self = Self { requires_auth: true, requires_admin: true, requires_guest: false };
}

#[derive(Debug, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    /// Segments starting with `:` capture a parameter.
    pub pattern: &'static str,
    pub meta: RouteMeta,
}

pub const ROUTES: &[RouteDef] = &[
    RouteDef { name: "Home", pattern: HOME_PATH, meta: RouteMeta::OPEN },
    RouteDef { name: "Login", pattern: LOGIN_PATH, meta: RouteMeta::GUEST },
    RouteDef { name: "Register", pattern: REGISTER_PATH, meta: RouteMeta::GUEST },
    RouteDef { name: "ComicDetail", pattern: "/comic/:id", meta: RouteMeta::OPEN },
    RouteDef { name: "AdminComicCreate", pattern: ADMIN_CREATE_COMIC_PATH, meta: RouteMeta::ADMIN },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static RouteDef,
    pub params: Vec<(&'static str, String)>,
    /// Path as requested, including any query or fragment.
    pub full_path: String,
}

impl RouteMatch {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
    }
}

/// Match `full_path` against [`ROUTES`]. Query strings and fragments are
/// ignored for matching; a trailing slash is tolerated.
#[must_use]
pub fn resolve(full_path: &str) -> Option<RouteMatch> {
    let path = full_path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    ROUTES.iter().find_map(|route| {
        let pattern: Vec<&str> = route.pattern.split('/').filter(|s| !s.is_empty()).collect();
        if pattern.len() != segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (want, got) in pattern.iter().copied().zip(segments.iter().copied()) {
            if let Some(name) = want.strip_prefix(':') {
                params.push((name, got.to_owned()));
            } else if want != got {
                return None;
            }
        }
        Some(RouteMatch { route, params, full_path: full_path.to_owned() })
    })
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches {0}")]
    UnknownRoute(String),
    #[error("too many guard redirects while navigating to {0}")]
    RedirectLoop(String),
}

/// Effectful navigation used by stores for post-action redirects.
#[async_trait::async_trait]
pub trait Navigator: Send + Sync {
    async fn push(&self, path: &str);
}

#[derive(Default)]
pub struct Router {
    session: OnceLock<Weak<SessionStore>>,
    current: RwLock<Option<RouteMatch>>,
    history: RwLock<Vec<String>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the session store the guard reads. Only the first call has effect.
    pub fn attach(&self, session: &Arc<SessionStore>) {
        let _ = self.session.set(Arc::downgrade(session));
    }

    fn session(&self) -> Option<Arc<SessionStore>> {
        let weak = self.session.get()?;
        let session = weak.upgrade();
        if session.is_none() {
            tracing::warn!("attached session store was dropped; treating user as anonymous");
        }
        session
    }

    #[must_use]
    pub fn current(&self) -> Option<RouteMatch> {
        self.current.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Every committed location, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Run the guard for `path`, following redirects, and commit the final route.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::UnknownRoute`] for paths outside the route
    /// table and [`NavigationError::RedirectLoop`] when redirects do not settle.
    pub async fn navigate(&self, path: &str) -> Result<RouteMatch, NavigationError> {
        let mut target = path.to_owned();

        for _ in 0..=MAX_REDIRECTS {
            let route = resolve(&target).ok_or_else(|| NavigationError::UnknownRoute(target.clone()))?;
            let auth = self.auth_view().await;

            match guard::evaluate(route.route.meta, &route.full_path, &auth) {
                GuardDecision::Allow => {
                    self.commit(&route);
                    return Ok(route);
                }
                GuardDecision::Redirect { to, return_url } => {
                    if let (Some(url), Some(session)) = (return_url, self.session()) {
                        session.set_return_url(Some(url));
                    }
                    tracing::debug!(from = %target, %to, "guard redirect");
                    target = to.to_owned();
                }
            }
        }

        Err(NavigationError::RedirectLoop(path.to_owned()))
    }

    async fn auth_view(&self) -> AuthView {
        let Some(session) = self.session() else {
            return AuthView { phase: AuthPhase::Anonymous, ..AuthView::default() };
        };
        let view = AuthView::from(&session.snapshot());
        if !guard::needs_session_fetch(&view) {
            return view;
        }
        session.fetch_session().await;
        AuthView::from(&session.snapshot())
    }

    fn commit(&self, route: &RouteMatch) {
        tracing::debug!(path = %route.full_path, name = route.route.name, "navigated");
        self.history
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(route.full_path.clone());
        *self.current.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(route.clone());
    }
}

#[async_trait::async_trait]
impl Navigator for Router {
    async fn push(&self, path: &str) {
        if let Err(e) = self.navigate(path).await {
            tracing::warn!(path, error = %e, "navigation failed");
        }
    }
}
