//! Loopback stand-in for the OAuth token endpoint and the drive files API.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

/// Token the server issues and accepts.
pub const ACCESS_TOKEN: &str = "fresh-access-token";
pub const REFRESH_TOKEN: &str = "refresh-me";

#[derive(Default)]
pub struct Counters {
    pub token_requests: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl Counters {
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

pub struct TestServer {
    pub base_url: String,
    pub counters: Arc<Counters>,
}

impl TestServer {
    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url)
    }
}

#[derive(Clone)]
struct ServerState {
    files: Arc<HashMap<String, Vec<u8>>>,
    counters: Arc<Counters>,
    reject_grants: bool,
}

/// Serve `files` by id. With `reject_grants`, every token request fails
/// with `invalid_grant`.
pub async fn spawn(
    files: HashMap<String, Vec<u8>>,
    reject_grants: bool,
) -> std::io::Result<TestServer> {
    let counters = Arc::new(Counters::default());
    let state = ServerState {
        files: Arc::new(files),
        counters: counters.clone(),
        reject_grants,
    };
    let app = Router::new()
        .route("/token", post(token))
        .route("/files/{id}", get(file))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!(error = %e, "test server stopped");
        }
    });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        counters,
    })
}

async fn token(
    State(state): State<ServerState>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    state.counters.token_requests.fetch_add(1, Ordering::SeqCst);
    if state.reject_grants {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid_grant"})),
        )
            .into_response();
    }

    match params.get("grant_type").map(String::as_str) {
        Some("refresh_token") if params.get("refresh_token").map(String::as_str) == Some(REFRESH_TOKEN) => {
            Json(serde_json::json!({
                "access_token": ACCESS_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer",
                "scope": "https://www.googleapis.com/auth/drive.readonly"
            }))
            .into_response()
        }
        Some("authorization_code") if params.contains_key("code") => Json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": REFRESH_TOKEN,
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "unsupported_grant_type"})),
        )
            .into_response(),
    }
}

async fn file(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let expected = format!("Bearer {ACCESS_TOKEN}");
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, "Invalid Credentials").into_response();
    }

    state.counters.downloads.fetch_add(1, Ordering::SeqCst);
    // Widen the window in which concurrent callers could race.
    tokio::time::sleep(Duration::from_millis(20)).await;

    match state.files.get(&id) {
        Some(bytes) => bytes.clone().into_response(),
        None => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}
