//! Application container: builds and owns the stores for one client session.
//!
//! SYSTEM CONTEXT
//! ==============
//! Created once at startup and handed to whatever drives the UI. Wiring:
//! the router reads the session store for guard decisions, the session store
//! pushes post-action redirects through the router, and the HTTP client asks
//! the session store for bearer tokens.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::net::api::ComicsApi;
use crate::net::http::{ApiError, HttpClient};
use crate::net::identity::{GoTrueClient, IdentityBackend, IdentityError};
use crate::net::storage::{FileStorage, MemoryStorage, SessionStorage};
use crate::router::Router;
use crate::state::auth::SessionStore;
use crate::state::catalogue::CatalogueStore;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

#[derive(Clone)]
pub struct App {
    pub session: Arc<SessionStore>,
    pub catalogue: Arc<CatalogueStore>,
    pub router: Arc<Router>,
}

impl App {
    /// Build the stores against the live identity backend and comics API.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::default()),
        };
        let identity = GoTrueClient::new(config.identity.clone(), config.timeouts, storage)?;
        let http = HttpClient::new(config.api_base_url.clone(), config.timeouts)?;
        Ok(Self::with_parts(Arc::new(identity), http))
    }

    /// Wire the stores around an existing identity backend and HTTP client.
    pub fn with_parts(identity: Arc<dyn IdentityBackend>, http: HttpClient) -> Self {
        let router = Arc::new(Router::new());
        let session = Arc::new(SessionStore::new(identity, router.clone()));
        router.attach(&session);

        let http = http.with_token_source(session.clone());
        let catalogue = Arc::new(CatalogueStore::new(ComicsApi::new(http)));

        Self { session, catalogue, router }
    }
}
