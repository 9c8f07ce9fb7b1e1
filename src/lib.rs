pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod workers;

use axum::http::{header, HeaderValue, Method};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Full application router with gzip responses, request tracing and CORS for the configured
/// frontend.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config().frontend_origin);
    routes::router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(frontend_origin: &str) -> CorsLayer {
    match HeaderValue::from_str(frontend_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(frontend_origin, "invalid FRONTEND_ORIGIN, CORS disabled");
            CorsLayer::new()
        }
    }
}
