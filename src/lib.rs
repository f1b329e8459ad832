pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod resolve;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::TokenKeys, catalog::Catalog, config::Config};

/// Application context built once at startup and shared by every handler.
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub tokens: TokenKeys,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::health))
        .route("/auth/register", post(routes::register))
        .route("/auth/login", post(routes::login))
        .route("/api/movies", get(routes::list_movies).post(routes::create_movie))
        .route("/api/movies/{id}", get(routes::get_movie).delete(routes::delete_movie))
        .route("/admin/seed", post(routes::seed))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
