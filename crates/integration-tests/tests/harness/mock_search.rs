//! Mock evidence search service

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Search service returning the same evidence for every query
pub struct MockSearch {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<SearchState>,
}

struct SearchState {
    results: Value,
    failing: bool,
    queries: Mutex<Vec<Value>>,
    authorizations: Mutex<Vec<Option<String>>>,
}

impl MockSearch {
    /// Serve `results` (a JSON array of evidence items)
    pub async fn start(results: Value) -> anyhow::Result<Self> {
        Self::start_inner(results, false).await
    }

    /// Answer every search with 503
    pub async fn start_failing() -> anyhow::Result<Self> {
        Self::start_inner(json!([]), true).await
    }

    async fn start_inner(results: Value, failing: bool) -> anyhow::Result<Self> {
        let state = Arc::new(SearchState {
            results,
            failing,
            queries: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/search", routing::post(handle_search))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Endpoint for the retrieval config
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Query bodies received so far
    pub fn queries(&self) -> Vec<Value> {
        self.state.queries.lock().expect("queries lock").clone()
    }

    /// `Authorization` header of each query
    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.state.authorizations.lock().expect("authorizations lock").clone()
    }
}

impl Drop for MockSearch {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_search(State(state): State<Arc<SearchState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.queries.lock().expect("queries lock").push(body);
    state.authorizations.lock().expect("authorizations lock").push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    );

    if state.failing {
        return (StatusCode::SERVICE_UNAVAILABLE, "index offline").into_response();
    }

    Json(json!({
        "results": state.results,
        "usage": {"model_id": "embed-test", "tokens": 6}
    }))
    .into_response()
}

/// Evidence item as the search service returns it
pub fn evidence(id: &str, document_id: &str, position: u32, text: &str) -> Value {
    json!({
        "id": id,
        "document_id": document_id,
        "text": text,
        "score": 0.87,
        "position": position,
    })
}
