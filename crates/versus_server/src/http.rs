//! HTTP surface: WebSocket endpoint, health check and server loop.

use crate::gateway::{Gateway, ws_handler};
use crate::registry::SessionRegistry;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument};

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: Arc<SessionRegistry>,
    gateway: Arc<Gateway>,
}

impl AppState {
    /// Builds the gateway over `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let gateway = Arc::new(Gateway::new(Arc::clone(&registry)));
        Self { registry, gateway }
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The connection gateway.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Server clock.
    pub timestamp: DateTime<Utc>,
    /// Live sessions.
    pub sessions: usize,
}

#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        sessions: state.registry.len(),
    })
}

/// Routes: `GET /ws` and `GET /health`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
}

/// Serves `state` on `listener` until `shutdown` resolves.
#[instrument(skip_all)]
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "WebSocket server ready at ws://{}/ws", addr);
    info!("Health check: http://{}/health", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server closed");
    Ok(())
}
