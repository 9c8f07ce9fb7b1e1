use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthUser;
use crate::response::{success, AppError};
use crate::services::progress;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_progress))
        .route("/stats", get(stats))
}

async fn get_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let progress = progress::get_progress(state.store(), &user.id).await?;
    Ok(success(progress))
}

async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let stats = progress::stats(state.store(), &user.id).await?;
    Ok(success(stats))
}
