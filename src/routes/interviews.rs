use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::models::{Interview, QuestionAttempt};
use crate::response::{success, AppError};
use crate::routes::parse_optional;
use crate::services::interview::{AnswerSubmission, NewInterview};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/history", get(history))
        .route("/:id", get(get_interview))
        .route("/:id/next-question", get(next_question))
        .route("/:id/answer", post(submit_answer))
        .route("/:id/complete", post(complete))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(rename = "type")]
    interview_type: Option<String>,
    mode: Option<String>,
    domain: Option<String>,
    num_questions: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    interview_id: String,
    questions: Vec<QuestionAttempt>,
    interview: Interview,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    question_id: Option<String>,
    answer: Option<String>,
    audio_url: Option<String>,
    video_url: Option<String>,
    duration: Option<f64>,
}

async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<StartRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = NewInterview {
        interview_type: parse_optional(payload.interview_type.as_deref(), "type")?,
        mode: parse_optional(payload.mode.as_deref(), "mode")?,
        domain: parse_optional(payload.domain.as_deref(), "domain")?,
        // out-of-range values are rejected by the service
        num_questions: payload
            .num_questions
            .map(|n| u32::try_from(n).unwrap_or(0)),
    };

    let interview = state.interviews().start(&user.id, request).await?;
    Ok((
        StatusCode::CREATED,
        success(StartResponse {
            interview_id: interview.id.clone(),
            questions: interview.questions.clone(),
            interview,
        }),
    ))
}

async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let interviews = state.interviews().history(&user.id).await?;
    Ok(success(interviews))
}

async fn get_interview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let interview = state.interviews().get(&id, &user.id).await?;
    Ok(success(interview))
}

async fn next_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let question = state.interviews().next_question(&id, &user.id).await?;
    Ok(success(question))
}

async fn submit_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = AnswerSubmission {
        question_id: payload.question_id,
        answer: payload.answer,
        audio_url: payload.audio_url,
        video_url: payload.video_url,
        duration: payload
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u32),
    };
    let submitted = state
        .interviews()
        .submit_answer(&id, &user.id, submission)
        .await?;
    Ok(success(submitted))
}

async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let completed = state.interviews().complete(&id, &user.id).await?;
    Ok(success(completed))
}
