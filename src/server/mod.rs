//! HTTP server for the ThinkGym wizard
//!
//! Exposes the three thinking routes plus health, version and an index page.

mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::ServerAppState;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    version: String,
    engine: Vec<String>,
    timeout_secs: u64,
}

/// Build the CORS layer; an empty origin list allows any origin
fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    if cors_origins.is_empty() {
        base.allow_origin(AnyOrigin)
    } else {
        let allowed_origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        base.allow_origin(allowed_origins)
    }
}

/// Turn a handler panic into the regular `SERVER_ERROR` body
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown error".to_string()
    };
    log::error!("Handler panicked: {}", message);
    ApiError::Server(message).into_response()
}

/// Build the router with all routes and layers.
///
/// Layer order: cors (outer) -> catch panic -> handler
pub fn build_router(state: ServerAppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/api/debate", post(routes::thinking_routes::debate_handler))
        .route(
            "/api/structure",
            post(routes::thinking_routes::structure_handler),
        )
        .route("/api/report", post(routes::thinking_routes::report_handler))
        .route("/api/version", get(version_handler))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until shutdown is requested
pub async fn run_server(state: ServerAppState) -> Result<(), String> {
    let bind = state.config.server.bind.clone();
    let port = state.config.server.port;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let cors_display = if state.config.server.cors_origins.is_empty() {
        "*".to_string()
    } else {
        state.config.server.cors_origins.join(", ")
    };

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                     ThinkGym Server                          ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║                                                              ║");
    println!("║  Server URL: http://{}:{:<24} ║", bind, port);
    println!("║  Engine: {:<52}║", state.engine.command().join(" "));
    println!("║  Timeout: {:<51}║", format!("{}s", state.engine.timeout().as_secs()));
    println!("║  CORS Origins: {:<46}║", cors_display);
    println!("║                                                              ║");
    println!("║  Endpoints:                                                  ║");
    println!("║    POST /api/debate     - Generate a pro/con debate          ║");
    println!("║    POST /api/structure  - Critique the user's reasoning      ║");
    println!("║    POST /api/report     - Build the session report           ║");
    println!("║    GET  /api/version    - Server version info                ║");
    println!("║    GET  /health         - Health check                       ║");
    println!("║                                                              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    // Stop accepting connections once shutdown is requested; queued engine
    // calls are rejected, running ones finish
    let shutdown_state = state.shutdown_state.clone();
    let engine = state.engine.clone();
    let shutdown_signal = async move {
        shutdown_state.requested().await;
        log::info!("Shutdown signal received, stopping server...");
        engine.pool().close();
    };

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e));

    state.shutdown_state.mark_drained();
    result
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Version endpoint - returns server version and engine setup
async fn version_handler(
    axum::extract::State(state): axum::extract::State<ServerAppState>,
) -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.engine.command().to_vec(),
        timeout_secs: state.engine.timeout().as_secs(),
    })
}

/// Index handler - lists the API
async fn index_handler() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>ThinkGym Server</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 600px;
            margin: 50px auto;
            padding: 20px;
            background: #fafafa;
            color: #171717;
        }
        code {
            background: #e5e5e5;
            padding: 2px 6px;
            border-radius: 4px;
            font-family: 'Monaco', 'Consolas', monospace;
        }
        .endpoint {
            background: #fff;
            border: 1px solid #e5e5e5;
            padding: 10px;
            border-radius: 12px;
            margin: 10px 0;
        }
    </style>
</head>
<body>
    <h1>ThinkGym</h1>
    <p>Topic &rarr; Debate &rarr; Notes &rarr; Structure feedback &rarr; Report</p>
    <h2>Endpoints</h2>
    <div class="endpoint">
        <strong>POST /api/debate</strong><br>
        <code>{"topic": "...", "round": 1, "seed": 42, "userNote": "..."}</code>
    </div>
    <div class="endpoint">
        <strong>POST /api/structure</strong><br>
        Same body plus <code>"debate": [4 turns]</code>
    </div>
    <div class="endpoint">
        <strong>POST /api/report</strong><br>
        Same body plus <code>"debate"</code> and an optional <code>"structure"</code>
    </div>
    <div class="endpoint">
        <strong>GET /health</strong><br>
        Health check endpoint
    </div>
</body>
</html>"#,
    )
}
