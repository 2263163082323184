//! Streamable HTTP/SSE transport
//!
//! Sessions are carried out-of-band in the `mcp-session-id` header. An
//! initialize POST with no header creates the session and echoes the new id
//! back; every other request must name a live session or is rejected with
//! the transport-level error before it reaches dispatch. The GET endpoint
//! attaches an SSE stream that drains the session's outbound channel
//! (notifications and broker-initiated requests); replies to those requests
//! come back as POSTed response envelopes and are routed to the broker.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::protocol::{Dispatcher, McpError, McpMessage};

/// Out-of-band session id header
pub const SESSION_HEADER: &str = "mcp-session-id";

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Shared state for HTTP handlers
struct AppState {
    dispatcher: Arc<Dispatcher>,
    /// Outbound receivers parked between session creation and SSE attach
    streams: Mutex<HashMap<String, mpsc::UnboundedReceiver<Value>>>,
}

/// HTTP transport for the MCP protocol
pub struct HttpTransport {
    dispatcher: Arc<Dispatcher>,
    port: u16,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(dispatcher: Arc<Dispatcher>, port: u16) -> Self {
        Self { dispatcher, port }
    }

    /// Build the router, for serving and for in-process tests
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            dispatcher: self.dispatcher.clone(),
            streams: Mutex::new(HashMap::new()),
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route(
                "/mcp",
                post(handle_mcp_request)
                    .get(handle_mcp_sse)
                    .delete(handle_mcp_delete),
            )
            .layer(cors)
            .with_state(state)
    }

    /// Run the HTTP server
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("0.0.0.0:{}", self.port);
        info!("Starting MCP HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

/// Root route confirming the server is up
async fn root() -> Json<Value> {
    Json(json!({
        "message": "mcp-showcase server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": { "mcp": "/mcp" },
    }))
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

fn reject_session(id: Option<Value>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(McpMessage::error_response(id, McpError::invalid_session())),
    )
        .into_response()
}

/// Handle an MCP envelope via HTTP POST
async fn handle_mcp_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(message): Json<McpMessage>,
) -> Response {
    debug!("HTTP request: {:?}", message.method);

    // replies to server-initiated requests route to the broker, never to
    // dispatch; an unmatched id is logged there and dropped
    if message.is_response() {
        state.dispatcher.accept_reply(&message);
        return StatusCode::ACCEPTED.into_response();
    }

    match session_id(&headers) {
        Some(id) => match state.dispatcher.sessions().resolve(&id) {
            Ok(session) => match state.dispatcher.dispatch(&session, message).await {
                Some(response) => Json(response).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            },
            Err(_) => {
                warn!("Rejecting request for unknown session {}", id);
                reject_session(message.id)
            }
        },
        None if message.is_request() && message.method.as_deref() == Some("initialize") => {
            let (tx, rx) = mpsc::unbounded_channel();
            let session = state.dispatcher.sessions().create(tx);
            state
                .streams
                .lock()
                .unwrap()
                .insert(session.id.clone(), rx);

            let response = state
                .dispatcher
                .dispatch(&session, message)
                .await
                .unwrap_or_else(|| McpMessage::response(Value::Null, json!({})));

            let mut http = Json(response).into_response();
            if let Ok(value) = HeaderValue::from_str(&session.id) {
                http.headers_mut().insert(SESSION_HEADER, value);
            }
            http
        }
        None => reject_session(message.id),
    }
}

/// Attach the session's server-to-client stream via SSE
async fn handle_mcp_sse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Sse<SseStream> {
    let receiver = session_id(&headers).and_then(|id| {
        if state.dispatcher.sessions().contains(&id) {
            state.streams.lock().unwrap().remove(&id)
        } else {
            None
        }
    });

    let stream: SseStream = match receiver {
        Some(mut rx) => {
            info!("SSE stream attached");
            Box::pin(async_stream::stream! {
                while let Some(envelope) = rx.recv().await {
                    yield Ok(Event::default().data(envelope.to_string()));
                }
            })
        }
        None => Box::pin(async_stream::stream! {
            yield Ok(Event::default()
                .event("error")
                .data(r#"{"error": "Invalid or missing session ID"}"#));
        }),
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Explicit session teardown
async fn handle_mcp_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return reject_session(None);
    };

    state.streams.lock().unwrap().remove(&id);
    match state.dispatcher.sessions().destroy(&id) {
        Ok(()) => {
            info!("Session {} closed by client", id);
            StatusCode::OK.into_response()
        }
        Err(_) => reject_session(None),
    }
}
