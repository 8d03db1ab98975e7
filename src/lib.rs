pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `pool` beforehand.
pub fn build_app(pool: SqlitePool) -> Router {
    let state = AppState {
        store: MemoryStore::new(pool),
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::memories::router())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
