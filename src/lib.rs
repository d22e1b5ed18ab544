pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::store::Store;

/// Full HTTP stack over an already opened store.
pub fn create_app_with_store(store: Store) -> axum::Router {
    routes::router(AppState::with_heuristics(store))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// In-memory app, used by tests and local experiments.
pub fn create_app() -> axum::Router {
    create_app_with_store(Store::memory())
}
