//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the status and maintenance handlers
//! - Wire up middleware (tracing, timeout, request ID, maintenance guard)
//! - Serve on a bound listener until the shutdown future completes

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppMode, WebConfig};
use crate::db::DbReadiness;
use crate::http::handlers::{self, ApiError};
use crate::observability::metrics;

/// Paths reachable while in maintenance mode.
const MAINTENANCE_ALLOWED: &[&str] = &["/api/status", "/maintenance"];

/// Application state injected into handlers. Frozen for the server's lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebConfig>,
    pub readiness: DbReadiness,
}

/// HTTP server for the web front-end.
pub struct HttpServer {
    router: Router,
    config: Arc<WebConfig>,
}

impl HttpServer {
    /// Create a new HTTP server over a frozen configuration.
    pub fn new(config: Arc<WebConfig>, readiness: DbReadiness) -> Self {
        let state = AppState {
            config: config.clone(),
            readiness,
        };
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.common.request_timeout_secs);

        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/maintenance", get(handlers::get_maintenance))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(state.clone(), maintenance_guard))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::from_fn(track_requests))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// Run the server on `listener` until `shutdown` completes.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = self.config.app_mode.as_str(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Reject everything but the status pages while the store needs maintenance.
async fn maintenance_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.config.app_mode == AppMode::Maintenance
        && !MAINTENANCE_ALLOWED.contains(&req.uri().path())
    {
        tracing::debug!(path = %req.uri().path(), "Request refused in maintenance mode");
        return ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "system is in maintenance mode, database needs to be created or upgraded",
        )
        .into_response();
    }
    next.run(req).await
}

async fn track_requests(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    metrics::record_request(response.status().as_u16());
    response
}
