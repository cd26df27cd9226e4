//! Relay server setup and startup.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::RelayConfig;
use crate::api;
use crate::state::AppState;

/// The relay HTTP server.
pub struct RelayServer {
    config: RelayConfig,
    state: Arc<AppState>,
}

impl RelayServer {
    pub fn new(config: RelayConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the router with all routes registered.
    ///
    /// Request bodies are capped at `max_body_bytes`; larger ones answer 413.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);

        Router::new()
            .route(
                "/api/chat",
                post(api::chat).fallback(api::method_not_allowed),
            )
            .route("/api/health", get(api::health))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(cors)
            .with_state(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr()).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            upstream = self.state.provider.name(),
            max_body_bytes = self.config.max_body_bytes,
            "starting relay server"
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
