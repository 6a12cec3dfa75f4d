//! HTTP API server for the mobility assistant

pub mod health;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::DbPool;
use crate::pipeline::Orchestrator;
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    pub db: DbPool,
    pub orchestrator: Orchestrator,
    pub max_audio_bytes: u64,
}

/// The HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    audio_dir: PathBuf,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: Arc<ApiState>, port: u16, audio_dir: PathBuf) -> Self {
        Self {
            state,
            port,
            audio_dir,
        }
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .nest("/api", voice::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .nest_service("/media/tts", ServeDir::new(&self.audio_dir))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
