use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthUser;
use crate::response::{success, AppError};
use crate::services::feedback;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/interview/:id", get(for_interview))
}

async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let items = feedback::list(state.store(), &user.id).await?;
    Ok(success(items))
}

async fn for_interview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    feedback::for_interview(state.store(), &id, &user.id)
        .await?
        .map(success)
        .ok_or_else(|| AppError::not_found("Feedback not found"))
}
