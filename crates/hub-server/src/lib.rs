//! Global Music Hub server
//!
//! Proxies the Radio Browser directory, caches the stations it returns and
//! stores user comments on stations and tracks. Persistence degrades to an
//! in-memory store when the database cannot be reached at startup.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use services::{CommentStore, StationDirectory, StationSynchronizer};
use storage::PersistenceGateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PersistenceGateway>,
    pub stations: Arc<StationSynchronizer>,
    pub comments: Arc<CommentStore>,
}

impl AppState {
    pub fn new(gateway: Arc<PersistenceGateway>, directory: Arc<dyn StationDirectory>) -> Self {
        Self {
            stations: Arc::new(StationSynchronizer::new(directory, gateway.clone())),
            comments: Arc::new(CommentStore::new(gateway.clone())),
            gateway,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stations/popular", get(handlers::stations::popular))
        .route("/stations/by-country/:country", get(handlers::stations::by_country))
        .route("/stations/search", get(handlers::stations::search))
        .route("/countries", get(handlers::stations::countries))
        .route("/comments", post(handlers::comments::create))
        .route(
            "/comments/:id",
            get(handlers::comments::list).delete(handlers::comments::delete),
        )
}
