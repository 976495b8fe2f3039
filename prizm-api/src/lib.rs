//! # PRIZM API Server
//!
//! REST surface for the lookup service. Every endpoint is a thin adapter
//! over [`LookupService`](prizm_lookup::LookupService) and the cache
//! store; no lookup or retention logic lives here.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health probe
//! - `GET  /api/v1/segments/:postal_code` - Single lookup
//! - `POST /api/v1/segments/batch` - Batch lookup (bounded)
//! - `GET  /api/v1/cache/stats` - Cache diagnostics
//! - `POST /api/v1/cache/sweep` - Remove expired entries
//! - `POST /api/v1/cache/clear` - Remove all entries
//! - `GET  /api/v1/cache/:postal_code` - Check one key
//! - `DELETE /api/v1/cache/:postal_code` - Delete one key
//!
//! ## Example
//!
//! ```rust,ignore
//! use prizm_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::new(service, ApiConfig::from_env());
//! server.run(([0, 0, 0, 0], 8080)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use dto::{BatchLookupResponse, LookupResponse};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use prizm_lookup::LookupService;

/// API server wrapping the lookup service.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server around an already-constructed service.
    pub fn new(service: LookupService, config: ApiConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config, service)),
        }
    }

    /// Creates the router with all routes and layers configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until shutdown.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("PRIZM API server listening on {}", addr);

        axum::serve(listener, self.router()).await
    }
}
