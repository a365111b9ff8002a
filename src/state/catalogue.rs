//! Comics list/detail cache and mutation state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Views read [`CatalogueState`]; actions go through [`ComicsApi`], which
//! picks up the bearer token from the session store for mutations.
//!
//! ERROR HANDLING
//! ==============
//! Each action clears `error` on entry and records a user-facing message on
//! failure. Fetches swallow the failure after recording it; create and update
//! return it so callers can keep an edit form open.

#[cfg(test)]
#[path = "catalogue_test.rs"]
mod catalogue_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::net::api::ComicsApi;
use crate::net::http::ApiError;
use crate::net::types::{Comic, ComicInput};

pub const NOT_FOUND_MESSAGE: &str = "Comic not found.";
pub const LIST_FAILED_MESSAGE: &str = "Failed to fetch the comics list.";
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create the new comic.";
pub const MISSING_DATA_MESSAGE: &str = "The server returned no comic data.";

fn detail_failed_message(id: i64) -> String {
    format!("Failed to fetch details for comic ID: {id}.")
}

fn update_failed_message(id: i64) -> String {
    format!("Failed to update comic ID: {id}.")
}

/// Text of a validation-shaped body field; non-string values are rendered as JSON.
fn body_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// User-facing message for a failed fetch.
fn fetch_error_message(err: &ApiError, fallback: impl FnOnce() -> String) -> String {
    let message = err.to_string();
    if message.is_empty() { fallback() } else { message }
}

/// User-facing message for a failed create/update: `details`, then `error`
/// from the response body, then the raised message, then `fallback`.
fn mutation_error_message(err: &ApiError, fallback: impl FnOnce() -> String) -> String {
    err.body()
        .and_then(|body| body_field(body, "details").or_else(|| body_field(body, "error")))
        .unwrap_or_else(|| fetch_error_message(err, fallback))
}

#[derive(Clone, Debug, Default)]
pub struct CatalogueState {
    pub comics: Vec<Comic>,
    pub current_comic: Option<Comic>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct CatalogueStore {
    api: ComicsApi,
    state: RwLock<CatalogueState>,
    list_generation: AtomicU64,
    detail_generation: AtomicU64,
}

impl CatalogueStore {
    #[must_use]
    pub fn new(api: ComicsApi) -> Self {
        Self {
            api,
            state: RwLock::new(CatalogueState::default()),
            list_generation: AtomicU64::new(0),
            detail_generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogueState> {
        self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogueState> {
        self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> CatalogueState {
        self.read().clone()
    }

    /// Reload the full list. The cached list is emptied while loading.
    pub async fn fetch_all_comics(&self) {
        let generation = self.list_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
            state.comics.clear();
        }

        let result = self.api.get_comics().await;

        if self.list_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding stale comics list response");
            return;
        }
        let mut state = self.write();
        match result {
            Ok(comics) => state.comics = comics,
            Err(e) => {
                tracing::error!(error = %e, "error fetching comics");
                state.error = Some(fetch_error_message(&e, || LIST_FAILED_MESSAGE.to_owned()));
            }
        }
        state.loading = false;
    }

    /// Load one comic into `current_comic`, which is emptied while loading.
    pub async fn fetch_comic_by_id(&self, id: i64) {
        let generation = self.detail_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
            state.current_comic = None;
        }

        let result = self.api.get_comic_detail(id).await;

        if self.detail_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(id, generation, "discarding stale comic detail response");
            return;
        }
        let mut state = self.write();
        match result {
            Ok(comic) => state.current_comic = comic,
            Err(e) => {
                tracing::error!(id, error = %e, "error fetching comic");
                state.error = Some(if e.status() == Some(404) {
                    NOT_FOUND_MESSAGE.to_owned()
                } else {
                    fetch_error_message(&e, || detail_failed_message(id))
                });
            }
        }
        state.loading = false;
    }

    /// Create a comic, then refresh the list.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] after recording its message in `error`.
    pub async fn create_new_comic(&self, input: &ComicInput) -> Result<Comic, ApiError> {
        self.begin_mutation();
        let payload = input.normalized();

        let result = self.api.create_comic(&payload).await.and_then(require_data);

        match result {
            Ok(comic) => {
                tracing::info!(id = comic.id, "comic created");
                self.fetch_all_comics().await;
                self.write().loading = false;
                Ok(comic)
            }
            Err(e) => {
                tracing::error!(error = %e, "error creating comic");
                let mut state = self.write();
                state.error = Some(mutation_error_message(&e, || CREATE_FAILED_MESSAGE.to_owned()));
                state.loading = false;
                Err(e)
            }
        }
    }

    /// Update a comic with a partial payload, refresh the list, and replace
    /// `current_comic` when it is the same record.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] after recording its message in `error`.
    pub async fn update_existing_comic(&self, id: i64, input: &ComicInput) -> Result<Comic, ApiError> {
        self.begin_mutation();
        let payload = input.normalized();

        let result = self.api.update_comic(id, &payload).await.and_then(require_data);

        match result {
            Ok(comic) => {
                tracing::info!(id, "comic updated");
                {
                    let mut state = self.write();
                    if state.current_comic.as_ref().is_some_and(|c| c.id == id) {
                        state.current_comic = Some(comic.clone());
                    }
                }
                self.fetch_all_comics().await;
                self.write().loading = false;
                Ok(comic)
            }
            Err(e) => {
                tracing::error!(id, error = %e, "error updating comic");
                let mut state = self.write();
                state.error = Some(mutation_error_message(&e, || update_failed_message(id)));
                state.loading = false;
                Err(e)
            }
        }
    }

    fn begin_mutation(&self) {
        let mut state = self.write();
        state.loading = true;
        state.error = None;
    }
}

fn require_data(comic: Option<Comic>) -> Result<Comic, ApiError> {
    comic.ok_or_else(|| ApiError::Decode(MISSING_DATA_MESSAGE.to_owned()))
}
