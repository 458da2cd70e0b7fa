//! HTTP server for the RAG system

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
pub use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    address: String,
    enable_cors: bool,
    state: AppState,
}

impl RagServer {
    /// Create a server around prepared state
    pub fn new(config: &AppConfig, state: AppState) -> Self {
        Self {
            address: config.server_address(),
            enable_cors: config.server.enable_cors,
            state,
        }
    }

    /// Build state from configuration and wrap it in a server
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let state = AppState::from_config(config).await?;
        Ok(Self::new(config, state))
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address '{}': {}", self.address, e)))?;

        let router = build_router(self.state, self.enable_cors);

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let router = routes::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}
