//! coldvault - upload archives to an S3 Glacier vault and track its inventory
//!
//! The crate has two halves. The server side ([`api`], [`glacier`]) exposes
//! three thin HTTP endpoints in front of the vault. The client side
//! ([`client`], [`store`], [`view`]) talks to those endpoints and keeps a
//! small amount of local state so a long-running inventory job can be
//! resumed across runs.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod glacier;
pub mod model;
pub mod store;
pub mod view;

use glacier::ArchiveService;

/// Largest upload accepted by default (Glacier's single-request limit is 4 GiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Archive transfer service, normally a [`glacier::GlacierClient`]
    pub service: Arc<dyn ArchiveService>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(service: Arc<dyn ArchiveService>) -> Self {
        Self {
            service,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let upload: Router<AppState> = Router::new()
        .route("/api/upload", post(api::upload_archive))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .merge(upload)
        .route("/api/inventory/initiate", post(api::initiate_inventory))
        .route("/api/inventory/status", get(api::inventory_status))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
