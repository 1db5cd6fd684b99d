//! Triage HTTP server with axum router and graceful shutdown.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::triage::TriageController;

use super::handlers::{get_health, post_answer, post_start, AppState};

/// Default port for the triage server.
pub const DEFAULT_PORT: u16 = 4000;

/// HTTP server exposing the triage operations.
pub struct TriageServer {
    /// Server configuration.
    config: ServerConfig,
    /// Application state shared across handlers.
    state: AppState,
    /// Token that triggers graceful shutdown.
    cancel: CancellationToken,
}

impl TriageServer {
    /// Create a new server with default configuration.
    #[must_use]
    pub fn new(controller: Arc<TriageController>, cancel: CancellationToken) -> Self {
        Self {
            config: ServerConfig::default(),
            state: AppState::new(controller),
            cancel,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/start", post(post_start))
            .route("/answer", post(post_answer))
            .route("/health", get(get_health))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server, binding to the configured address.
    ///
    /// The server runs until the cancellation token is triggered, then
    /// shuts down gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener. Useful for ephemeral-port tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to serve.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let cancel = self.cancel.clone();
        let app = self.build_router();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Starting triage server");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Triage server shutting down gracefully");
            })
            .await
    }
}
