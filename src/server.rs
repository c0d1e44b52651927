//! HTTP server exposing the query facade.
//!
//! Serves three surfaces off one router: a JSON REST API for direct
//! integration, an MCP Streamable HTTP endpoint for protocol clients,
//! and a health probe.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all operations with parameter schemas |
//! | `POST` | `/tools/{name}` | Call one operation by name |
//! | `ANY`  | `/mcp` | MCP Streamable HTTP (JSON-RPC) |
//! | `GET`  | `/health` | Health probe with dataset summary |
//!
//! # Error Contract
//!
//! Per-call failures return the facade envelope with a mapped status:
//!
//! ```json
//! { "error": { "error_kind": "not_found", "message": "schema 'x' not found" } }
//! ```
//!
//! `not_found` → 404, `invalid_input` → 400. Nothing a caller sends can
//! take the process down; only a failed dataset load at startup does.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients and cross-origin MCP tool calls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::QueryError;
use crate::mcp;
use crate::tools::{error_envelope, ToolContext, ToolRegistry};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    tools: Arc<ToolRegistry>,
}

/// Starts the HTTP server over an already-loaded engine.
///
/// Binds to `[server].bind` and serves until the process is terminated.
/// The engine is loaded before this is called, so a malformed dataset
/// never gets as far as accepting connections.
pub async fn run_server(config: &Config, engine: Arc<Engine>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let tools = Arc::new(ToolRegistry::with_builtins());

    println!("Registered {} tools:", tools.len());
    for t in tools.tools() {
        println!("  POST /tools/{} — {}", t.name(), t.description());
    }

    let state = AppState {
        engine: engine.clone(),
        tools: tools.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp::http_service(engine, tools))
        .layer(cors)
        .with_state(state);

    println!("CDES server listening on http://{}", bind_addr);
    println!("MCP endpoint at http://{}/mcp", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Wraps a per-call error for conversion into an HTTP response carrying
/// the facade envelope.
struct AppError(QueryError);

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(error_envelope(&self.0))).into_response()
    }
}

// ============ GET /health ============

/// Handler for `GET /health`.
///
/// Used by container probes and load balancers; the payload carries the
/// loaded schema names and per-category entity counts.
async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(state.engine.health())
}

// ============ GET /tools/list ============

/// One operation in the `GET /tools/list` response.
#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    parameters: Value,
}

/// JSON response body for `GET /tools/list`.
#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

/// Handler for `GET /tools/list`.
async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters: t.parameters_schema(),
        })
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Handler for `POST /tools/{name}`.
///
/// Unified dispatch through the tool registry. Unknown names, bad
/// parameters, and missing schemas/entities all come back as the
/// facade envelope; validation failures are a 200 with `valid: false`.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let ctx = ToolContext::new(state.engine.clone());
    let result = state.tools.call(&name, params, &ctx).await?;
    Ok(Json(serde_json::json!({ "result": result })))
}
