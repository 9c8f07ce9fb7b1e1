use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::{QuestionFilter, Store, StoreError};
use crate::models::{Feedback, Interview, InterviewStatus, Progress, ProgressUpdate, Question};

#[derive(Default)]
struct Collections {
    questions: Vec<Question>,
    interviews: HashMap<String, Interview>,
    feedback: Vec<Feedback>,
    progress: HashMap<String, Progress>,
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question_count(&self) -> usize {
        self.inner.read().questions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_questions(
        &self,
        filter: &QuestionFilter,
        limit: usize,
    ) -> Result<Vec<Question>, StoreError> {
        let guard = self.inner.read();
        Ok(guard
            .questions
            .iter()
            .filter(|q| filter.matches(q))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let guard = self.inner.read();
        Ok(guard.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_question(&self, question: &Question) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        if guard.questions.iter().any(|q| q.id == question.id) {
            return Err(StoreError::Custom(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        guard.questions.push(question.clone());
        Ok(())
    }

    async fn question_categories(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<String>, StoreError> {
        let guard = self.inner.read();
        let categories: BTreeSet<String> = guard
            .questions
            .iter()
            .filter(|q| filter.matches(q))
            .map(|q| q.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn insert_interview(&self, interview: &Interview) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        guard
            .interviews
            .insert(interview.id.clone(), interview.clone());
        Ok(())
    }

    async fn save_interview(&self, interview: &Interview) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        match guard.interviews.get_mut(&interview.id) {
            Some(existing) => {
                *existing = interview.clone();
                Ok(())
            }
            None => Err(StoreError::Custom(format!(
                "interview {} does not exist",
                interview.id
            ))),
        }
    }

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, StoreError> {
        Ok(self.inner.read().interviews.get(id).cloned())
    }

    async fn list_interviews(
        &self,
        user_id: &str,
        status: Option<InterviewStatus>,
    ) -> Result<Vec<Interview>, StoreError> {
        let guard = self.inner.read();
        let mut interviews: Vec<Interview> = guard
            .interviews
            .values()
            .filter(|i| i.user_id == user_id)
            .filter(|i| status.map_or(true, |s| s == i.status))
            .cloned()
            .collect();
        interviews.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(interviews)
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StoreError> {
        self.inner.write().feedback.push(feedback.clone());
        Ok(())
    }

    async fn find_feedback_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        let guard = self.inner.read();
        Ok(guard
            .feedback
            .iter()
            .find(|f| f.interview_id == interview_id && f.user_id == user_id)
            .cloned())
    }

    async fn list_feedback(&self, user_id: &str) -> Result<Vec<Feedback>, StoreError> {
        let guard = self.inner.read();
        let mut records: Vec<Feedback> = guard
            .feedback
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(records)
    }

    async fn find_progress(&self, user_id: &str) -> Result<Option<Progress>, StoreError> {
        Ok(self.inner.read().progress.get(user_id).cloned())
    }

    async fn insert_progress(&self, progress: &Progress) -> Result<bool, StoreError> {
        let mut guard = self.inner.write();
        if guard.progress.contains_key(&progress.user_id) {
            return Ok(false);
        }
        guard
            .progress
            .insert(progress.user_id.clone(), progress.clone());
        Ok(true)
    }

    async fn apply_progress_update(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<bool, StoreError> {
        let mut guard = self.inner.write();
        match guard.progress.get_mut(user_id) {
            Some(progress) => {
                update.apply_to(progress);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
