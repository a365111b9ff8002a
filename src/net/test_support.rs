//! In-process comics API used by network and store tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::api::ComicsApi;
use super::http::{HttpClient, TokenSource};
use crate::config::HttpTimeouts;

pub const GOOD_TOKEN: &str = "good-token";

#[derive(Debug, Default)]
pub struct MockState {
    pub comics: Vec<Value>,
    pub next_id: i64,
    pub list_calls: usize,
    pub last_authorization: Option<String>,
    pub last_body: Option<Value>,
    /// Served once, after a delay, by the next list request.
    pub slow_list: Option<(Duration, Vec<Value>)>,
}

pub struct MockComicsServer {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockComicsServer {
    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.lock().unwrap().last_body.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.lock().unwrap().last_authorization.clone()
    }

    /// Make the next list request wait `delay` and then answer with `comics`.
    pub fn delay_next_list(&self, delay: Duration, comics: Vec<Value>) {
        self.state.lock().unwrap().slow_list = Some((delay, comics));
    }

    pub fn api(&self, token: Option<&'static str>) -> ComicsApi {
        let http = HttpClient::new(self.base_url.clone(), HttpTimeouts::default())
            .unwrap()
            .with_token_source(Arc::new(FixedToken(token)));
        ComicsApi::new(http)
    }
}

pub struct FixedToken(pub Option<&'static str>);

impl TokenSource for FixedToken {
    fn access_token(&self) -> Option<String> {
        self.0.map(str::to_owned)
    }
}

pub fn comic_json(id: i64, title: &str) -> Value {
    json!({ "id": id, "title": title, "description": null, "author_name": "Anon" })
}

/// Start a mock API seeded with `comics`; ids continue after the highest seed.
pub async fn spawn_comics_server(comics: Vec<Value>) -> MockComicsServer {
    let next_id = comics.iter().filter_map(|c| c["id"].as_i64()).max().unwrap_or(0) + 1;
    let state = Arc::new(Mutex::new(MockState { comics, next_id, ..MockState::default() }));

    let app = Router::new()
        .route("/comics", get(list_comics).post(create_comic))
        .route("/comics/{id}", get(show_comic).put(update_comic))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockComicsServer { base_url: format!("http://{addr}"), state }
}

type Shared = State<Arc<Mutex<MockState>>>;

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Comic not found" }))).into_response()
}

fn authorize(state: &mut MockState, headers: &HeaderMap) -> Result<(), Response> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
    state.last_authorization.clone_from(&auth);
    if auth.as_deref() == Some(format!("Bearer {GOOD_TOKEN}").as_str()) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response())
    }
}

async fn list_comics(State(state): Shared) -> Response {
    let slow = {
        let mut state = state.lock().unwrap();
        state.list_calls += 1;
        state.slow_list.take()
    };
    if let Some((delay, comics)) = slow {
        tokio::time::sleep(delay).await;
        return Json(json!({ "data": comics })).into_response();
    }
    let state = state.lock().unwrap();
    Json(json!({ "data": state.comics })).into_response()
}

async fn show_comic(State(state): Shared, Path(id): Path<i64>) -> Response {
    let state = state.lock().unwrap();
    match state.comics.iter().find(|c| c["id"] == id) {
        Some(comic) => Json(json!({ "data": comic })).into_response(),
        None => not_found(),
    }
}

async fn create_comic(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(resp) = authorize(&mut state, &headers) {
        return resp;
    }
    state.last_body = Some(body.clone());
    let title = body["title"].as_str().unwrap_or_default();
    if title.len() < 3 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid input", "details": "title must be at least 3 characters" })),
        )
            .into_response();
    }
    let id = state.next_id;
    state.next_id += 1;
    let mut comic = body.clone();
    comic["id"] = json!(id);
    state.comics.push(comic.clone());
    (StatusCode::CREATED, Json(json!({ "data": comic }))).into_response()
}

async fn update_comic(
    State(state): Shared,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(resp) = authorize(&mut state, &headers) {
        return resp;
    }
    state.last_body = Some(body.clone());
    let Some(comic) = state.comics.iter_mut().find(|c| c["id"] == id) else {
        return not_found();
    };
    if let (Some(target), Some(patch)) = (comic.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
    let updated = comic.clone();
    Json(json!({ "data": updated })).into_response()
}
