//! Mock model vendor for integration tests
//!
//! Speaks just enough of the Anthropic Messages and Google
//! `generateContent` APIs to drive the real adapters. Replies are scripted:
//! each request consumes the next one, and the last reply repeats once the
//! script runs out.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// One scripted vendor reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: Value,
}

impl Reply {
    /// Anthropic text answer
    pub fn anthropic_text(text: &str, input_tokens: u32, output_tokens: u32) -> Self {
        Self::ok(json!({
            "id": "msg_text",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "mock",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
        }))
    }

    /// Anthropic turn requesting one tool call
    pub fn anthropic_tool_use(id: &str, name: &str, input: Value) -> Self {
        Self::ok(json!({
            "id": "msg_tool",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "tool_use", "id": id, "name": name, "input": input}],
            "model": "mock",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 3}
        }))
    }

    /// Anthropic turn with no content at all
    pub fn anthropic_empty() -> Self {
        Self::ok(json!({
            "id": "msg_empty",
            "type": "message",
            "role": "assistant",
            "content": [],
            "model": "mock",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 4, "output_tokens": 0}
        }))
    }

    /// Anthropic error body
    pub fn anthropic_error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({"type": "error", "error": {"type": "api_error", "message": message}}),
        }
    }

    /// Google text answer
    pub fn google_text(text: &str, prompt_tokens: u32, candidate_tokens: u32) -> Self {
        Self::ok(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": prompt_tokens, "candidatesTokenCount": candidate_tokens}
        }))
    }

    /// Google turn requesting one function call
    pub fn google_function_call(name: &str, args: Value) -> Self {
        Self::ok(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"functionCall": {"name": name, "args": args}}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 2}
        }))
    }

    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// A request as the vendor received it
#[derive(Debug, Clone)]
pub struct Captured {
    /// `messages` for Anthropic, the `{model}:generateContent` segment for Google
    pub endpoint: String,
    /// Key from the `x-api-key` header or the `key` query parameter
    pub api_key: Option<String>,
    pub body: Value,
}

/// Mock vendor bound to a random local port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<VendorState>,
}

struct VendorState {
    request_count: AtomicU32,
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Captured>>,
}

impl VendorState {
    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().expect("script lock");
        if script.len() > 1 {
            script.pop_front().expect("non-empty script")
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Reply::anthropic_error(StatusCode::INTERNAL_SERVER_ERROR, "script is empty"))
        }
    }

    fn capture(&self, captured: Captured) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().expect("requests lock").push(captured);
    }
}

impl MockVendor {
    /// Start the mock vendor with a reply script, returning immediately
    pub async fn start(script: Vec<Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(VendorState {
            request_count: AtomicU32::new(0),
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/messages", routing::post(handle_messages))
            .route("/v1beta/models/{action}", routing::post(handle_generate_content))
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

    /// Base URL for an Anthropic provider
    pub fn anthropic_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for a Google provider
    pub fn google_base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Number of requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<Captured> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_messages(
    State(state): State<Arc<VendorState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    state.capture(Captured {
        endpoint: "messages".to_owned(),
        api_key,
        body,
    });
    state.next_reply()
}

async fn handle_generate_content(
    State(state): State<Arc<VendorState>>,
    Path(action): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.capture(Captured {
        endpoint: action,
        api_key: params.get("key").cloned(),
        body,
    });
    state.next_reply()
}
