use super::*;
use axum::Json;
use axum::Router;
use axum::http::{HeaderMap as AxumHeaders, StatusCode};
use axum::routing::{delete, get, post};
use serde_json::json;

struct StaticToken(Option<&'static str>);

impl TokenSource for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.map(str::to_owned)
    }
}

fn header_str(headers: &AxumHeaders, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map_or(Value::Null, |v| Value::String(v.to_owned()))
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/echo-headers",
            get(|headers: AxumHeaders| async move {
                Json(json!({
                    "authorization": header_str(&headers, "authorization"),
                    "content_type": header_str(&headers, "content-type"),
                    "x_trace": header_str(&headers, "x-trace"),
                }))
            }),
        )
        .route("/echo-body", post(|Json(body): Json<Value>| async move { Json(body) }))
        .route("/no-content", delete(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/validation",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid input", "details": "title is required" })),
                )
            }),
        )
        .route(
            "/expired",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token expired" }))) }),
        )
        .route("/plain-error", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
        .route("/garbage", get(|| async { (StatusCode::OK, "not json") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String, token: Option<&'static str>) -> HttpClient {
    HttpClient::new(base_url, HttpTimeouts::default())
        .unwrap()
        .with_token_source(Arc::new(StaticToken(token)))
}

// =============================================================================
// headers
// =============================================================================

#[tokio::test]
async fn always_sends_json_content_type() {
    let base = spawn_server().await;
    let body = client(base, None)
        .request("/echo-headers", RequestOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["content_type"], "application/json");
}

#[tokio::test]
async fn bearer_token_attached_only_when_auth_required() {
    let base = spawn_server().await;
    let api = client(base, Some("tok-1"));

    let public = api.request("/echo-headers", RequestOptions::default()).await.unwrap().unwrap();
    assert_eq!(public["authorization"], Value::Null);

    let private = api
        .request("/echo-headers", RequestOptions::new(Method::GET).authenticated())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(private["authorization"], "Bearer tok-1");
}

#[tokio::test]
async fn auth_required_without_session_sends_no_token() {
    let base = spawn_server().await;
    let body = client(base, None)
        .request("/echo-headers", RequestOptions::new(Method::GET).authenticated())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["authorization"], Value::Null);
}

#[tokio::test]
async fn caller_headers_are_merged() {
    let base = spawn_server().await;
    let body = client(base, None)
        .request("/echo-headers", RequestOptions::default().header("x-trace", "abc"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["x_trace"], "abc");
    assert_eq!(body["content_type"], "application/json");
}

#[tokio::test]
async fn invalid_caller_header_is_rejected_before_sending() {
    let base = spawn_server().await;
    let err = client(base, None)
        .request("/echo-headers", RequestOptions::default().header("bad header", "v"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidHeader(_)));
}

// =============================================================================
// responses
// =============================================================================

#[tokio::test]
async fn json_body_round_trips() {
    let base = spawn_server().await;
    let body = client(base, None)
        .request("/echo-body", RequestOptions::new(Method::POST).json(json!({ "title": "X" })))
        .await
        .unwrap();
    assert_eq!(body, Some(json!({ "title": "X" })));
}

#[tokio::test]
async fn no_content_yields_explicit_empty_result() {
    let base = spawn_server().await;
    let body = client(base, None)
        .request("/no-content", RequestOptions::new(Method::DELETE))
        .await
        .unwrap();
    assert_eq!(body, None);
}

#[tokio::test]
async fn error_body_is_parsed_and_attached() {
    let base = spawn_server().await;
    let err = client(base, None)
        .request("/validation", RequestOptions::new(Method::POST).json(json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.body().unwrap()["details"], "title is required");
    assert_eq!(err.to_string(), "HTTP error! status: 400");
}

#[tokio::test]
async fn error_message_field_becomes_error_message() {
    let base = spawn_server().await;
    let err = client(base, None).request("/expired", RequestOptions::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "token expired");
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status_text() {
    let base = spawn_server().await;
    let err = client(base, None)
        .request("/plain-error", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.body(), Some(&json!({ "message": "Bad Gateway" })));
    assert_eq!(err.to_string(), "Bad Gateway");
}

#[tokio::test]
async fn missing_route_is_http_404() {
    let base = spawn_server().await;
    let err = client(base, None).request("/nope", RequestOptions::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn invalid_success_body_is_decode_error() {
    let base = spawn_server().await;
    let err = client(base, None).request("/garbage", RequestOptions::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn connection_failure_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}"), None)
        .request("/comics", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.status(), None);
}

// =============================================================================
// parsing helpers
// =============================================================================

#[test]
fn http_error_without_reason_uses_status_message() {
    let err = http_error(599, None, "");
    assert_eq!(err.to_string(), "HTTP error! status: 599");
}

#[test]
fn empty_success_body_is_null() {
    assert_eq!(parse_success_body("  ").unwrap(), Value::Null);
}
