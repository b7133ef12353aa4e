//! Crewline Server - crew workflow backend
//!
//! A Rust backend for defining and running agent crews:
//! - RESTful HTTP API via axum for crew definition CRUD (YAML on disk)
//! - Streaming run endpoint (newline-delimited JSON events)
//! - Human-in-the-loop input submission correlated through a shared broker
//!
//! This crate can be used standalone (`crewline-server` binary) or embedded
//! in other applications; `start_server_with_state` lets callers inject
//! their own store and agent runner.

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crewline_core::crew::CrewStore;
use crewline_core::runner::HttpAgentRunner;

use self::state::{AppState, AppStateInner};

/// Configuration for the Crewline backend server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding one subdirectory per crew.
    pub crews_dir: String,
    /// Optional path to static frontend files (Vite build).
    /// When set, the server serves these files for all non-API routes.
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            crews_dir: "crews".to_string(),
            static_dir: None,
        }
    }
}

/// Create a shared `AppState` from a config, using the env-configured
/// HTTP agent runner.
pub fn create_app_state(config: &ServerConfig) -> AppState {
    Arc::new(AppStateInner::new(
        CrewStore::new(&config.crews_dir),
        Arc::new(HttpAgentRunner::from_env()),
    ))
}

/// Start the backend server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewline_server=info,crewline_core=info,tower_http=info".into()),
        )
        .init();

    tracing::info!(
        "Starting Crewline backend server on {}:{}",
        config.host,
        config.port
    );

    let state = create_app_state(&config);
    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
///
/// This variant is useful when you want to inject a custom store or agent
/// runner (tests do this with a scripted runner).
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .merge(api::api_router())
        .route("/api", axum::routing::get(hello))
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Serve static frontend files if configured
    if let Some(ref static_dir) = config.static_dir {
        let static_path = std::path::Path::new(static_dir);
        if static_path.exists() && static_path.is_dir() {
            tracing::info!("Serving static frontend from: {}", static_dir);
            let serve_dir = tower_http::services::ServeDir::new(static_dir)
                .not_found_service(tower_http::services::ServeFile::new(
                    static_path.join("index.html"),
                ));
            app = app.fallback_service(serve_dir);
        } else {
            tracing::warn!(
                "Static directory not found: {}. Frontend won't be served.",
                static_dir
            );
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Crewline backend server listening on {}", local_addr);

    // Spawn the server in a background task
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn hello() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "message": "Hello from Crewline!" }))
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "crewline-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
