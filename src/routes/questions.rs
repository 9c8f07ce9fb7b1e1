use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::QuestionFilter;
use crate::response::{success, AppError};
use crate::routes::parse_optional;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/categories", get(categories))
        .route("/:id", get(get_question))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    question_type: Option<String>,
    domain: Option<String>,
    difficulty: Option<String>,
    category: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<QuestionFilter, AppError> {
        Ok(QuestionFilter {
            question_type: parse_optional(self.question_type.as_deref(), "type")?,
            domain: parse_optional(self.domain.as_deref(), "domain")?,
            difficulty: parse_optional(self.difficulty.as_deref(), "difficulty")?,
            category: self.category.filter(|c| !c.trim().is_empty()),
            ..QuestionFilter::default()
        })
    }
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let questions = state.questions().list(&query.into_filter()?).await?;
    Ok(success(questions))
}

async fn categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    // only type and domain narrow the category list
    let filter = ListQuery {
        difficulty: None,
        category: None,
        ..query
    }
    .into_filter()?;
    let categories = state.questions().categories(&filter).await?;
    Ok(success(categories))
}

async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.questions().get(&id).await? {
        Some(question) => Ok(success(question)),
        None => Err(AppError::not_found("Question not found")),
    }
}
