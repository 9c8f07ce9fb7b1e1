pub mod config;
pub mod memory;
pub mod migrate;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Difficulty, Domain, Feedback, Interview, InterviewStatus, Progress, ProgressUpdate, Question,
    QuestionType,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Filter over active questions. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub question_type: Option<QuestionType>,
    pub domain: Option<Domain>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
    pub exclude_ids: Vec<String>,
    pub exclude_categories: Vec<String>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        question.is_active
            && self.question_type.map_or(true, |t| t == question.question_type)
            && self.domain.map_or(true, |d| d == question.domain)
            && self.difficulty.map_or(true, |d| d == question.difficulty)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == question.category)
            && !self.exclude_ids.iter().any(|id| *id == question.id)
            && !self
                .exclude_categories
                .iter()
                .any(|c| *c == question.category)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("{0}")]
    Custom(String),
}

/// Document collections backing interviews, questions, feedback and progress.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_questions(
        &self,
        filter: &QuestionFilter,
        limit: usize,
    ) -> Result<Vec<Question>, StoreError>;

    async fn find_question(&self, id: &str) -> Result<Option<Question>, StoreError>;

    async fn insert_question(&self, question: &Question) -> Result<(), StoreError>;

    async fn question_categories(&self, filter: &QuestionFilter)
        -> Result<Vec<String>, StoreError>;

    async fn insert_interview(&self, interview: &Interview) -> Result<(), StoreError>;

    /// Replaces the whole interview document. Concurrent saves are last-write-wins.
    async fn save_interview(&self, interview: &Interview) -> Result<(), StoreError>;

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, StoreError>;

    /// Interviews of one user, newest first.
    async fn list_interviews(
        &self,
        user_id: &str,
        status: Option<InterviewStatus>,
    ) -> Result<Vec<Interview>, StoreError>;

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StoreError>;

    async fn find_feedback_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError>;

    /// Feedback records of one user, newest first.
    async fn list_feedback(&self, user_id: &str) -> Result<Vec<Feedback>, StoreError>;

    async fn find_progress(&self, user_id: &str) -> Result<Option<Progress>, StoreError>;

    /// Inserts unless a record for the same user exists. Returns whether it inserted.
    async fn insert_progress(&self, progress: &Progress) -> Result<bool, StoreError>;

    /// Applies `update` atomically. Returns false when the user has no progress record.
    async fn apply_progress_update(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<bool, StoreError>;
}
