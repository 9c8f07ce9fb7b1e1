mod feedback;
mod health;
mod interviews;
mod progress;
mod questions;

use std::str::FromStr;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::middleware::auth::require_auth;
use crate::models::UnknownVariant;
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/interviews", interviews::router())
        .nest("/questions", questions::router())
        .nest("/feedback", feedback::router())
        .nest("/progress", progress::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .nest("/health", health::router());

    Router::new()
        .nest("/api", api)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}

/// Parses an optional enum-valued request field; blank counts as absent.
pub(crate) fn parse_optional<T>(value: Option<&str>, field: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = UnknownVariant>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid {field}: {raw}"))),
    }
}
