//! # HTTP API
//!
//! axum router and server lifecycle.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | banner |
//! | GET | `/health` | liveness |
//! | GET | `/api/status` | service and session status |
//! | POST | `/api/upload` | multipart `file` upload |
//! | GET | `/api/parameters` | current parameter set |
//! | POST | `/api/apply-stage` | `{"stage": "stage1"}` |
//! | POST | `/api/export` | placeholder export, optional `{"stage": ...}` |
//!
//! Sessions are keyed by the `x-session-id` header. The upload response
//! returns the id to use for later calls. At most `max_sessions` are kept;
//! see [`sessions::SessionStore`].

pub mod error;
pub mod handlers;
pub mod sessions;
pub mod types;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
pub use error::ApiError;
pub use handlers::SESSION_HEADER;
use sessions::SessionStore;

// =============================================================================
// STATE
// =============================================================================

/// Shared state of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub(crate) sessions: Arc<RwLock<SessionStore>>,
    pub(crate) config: Arc<ServerConfig>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub(crate) started_at: Instant,
}

impl AppState {
    /// Build state from configuration. No I/O happens here.
    pub fn new(config: ServerConfig) -> Self {
        let limiter = NonZeroU32::new(config.rate_limit_per_sec)
            .map(|per_sec| Arc::new(RateLimiter::direct(Quota::per_second(per_sec))));
        Self {
            sessions: Arc::new(RwLock::new(SessionStore::new(config.max_sessions))),
            config: Arc::new(config),
            limiter,
            started_at: Instant::now(),
        }
    }

    /// Number of live sessions. Every session holds a loaded file.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .route("/api/upload", post(handlers::upload))
        .route("/api/parameters", get(handlers::parameters))
        .route("/api/apply-stage", post(handlers::apply_stage))
        .route("/api/export", post(handlers::export))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Reject requests beyond the configured rate.
async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state
        .limiter
        .as_ref()
        .is_some_and(|limiter| limiter.check().is_err())
    {
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

// =============================================================================
// SERVER
// =============================================================================

/// Bind, serve, and shut down gracefully on Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr = config.bind_addr();
    info!(
        addr = %addr,
        upload_dir = %config.upload_dir.display(),
        max_upload_bytes = config.max_upload_bytes,
        rate_limit_per_sec = config.rate_limit_per_sec,
        max_sessions = config.max_sessions,
        "Starting ecutune server"
    );

    let app = create_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
