use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{extract_token, verify_jwt_hs256, AuthError};
use crate::response::AppError;
use crate::state::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        return AppError::unauthorized("No token provided. Please login to continue.")
            .into_response();
    };

    match verify_jwt_hs256(&token, &state.config().jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(AuthError::Expired) => {
            AppError::unauthorized("Token expired. Please login again.").into_response()
        }
        Err(err) => {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::unauthorized("Invalid token. Please login again.").into_response()
        }
    }
}
