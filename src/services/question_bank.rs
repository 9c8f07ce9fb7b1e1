//! Question bank resolver: stored questions first, AI-generated backfill for any shortfall.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::db::{QuestionFilter, Store, StoreError};
use crate::models::{Difficulty, Domain, Question, QuestionType, DEFAULT_CATEGORY, DEFAULT_TIME_LIMIT_SECS};
use crate::services::ai::prompts::{self, GeneratedQuestion};
use crate::services::ai::AiGateway;

pub const LIST_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct QuestionQuery {
    pub question_type: QuestionType,
    pub domain: Domain,
    pub difficulty: Difficulty,
    pub exclude_ids: Vec<String>,
    pub exclude_categories: Vec<String>,
}

impl QuestionQuery {
    pub fn new(question_type: QuestionType, domain: Domain, difficulty: Difficulty) -> Self {
        Self {
            question_type,
            domain,
            difficulty,
            exclude_ids: Vec::new(),
            exclude_categories: Vec::new(),
        }
    }

    // Difficulty only steers generation; stored questions of any difficulty qualify.
    fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            question_type: Some(self.question_type),
            domain: Some(self.domain),
            exclude_ids: self.exclude_ids.clone(),
            exclude_categories: self.exclude_categories.clone(),
            ..QuestionFilter::default()
        }
    }
}

#[derive(Clone)]
pub struct QuestionBank {
    store: Arc<dyn Store>,
    ai: AiGateway,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn Store>, ai: AiGateway) -> Self {
        Self { store, ai }
    }

    /// Up to `count` questions: stored matches first, then one parallel generation per
    /// missing question. Generated questions are persisted before they are returned.
    pub async fn get_questions(
        &self,
        query: &QuestionQuery,
        count: usize,
    ) -> Result<Vec<Question>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut questions = self.store.find_questions(&query.filter(), count).await?;
        let shortfall = count.saturating_sub(questions.len());
        debug!(
            found = questions.len(),
            shortfall,
            question_type = %query.question_type,
            domain = %query.domain,
            "resolved stored questions"
        );
        if shortfall == 0 {
            return Ok(questions);
        }

        let asked = asked_categories(&query.exclude_categories, &questions);
        let generations = (0..shortfall).map(|_| {
            prompts::generate_question(
                &self.ai,
                query.question_type,
                query.domain,
                query.difficulty,
                &asked,
            )
        });
        let generated = join_all(generations).await;

        for candidate in generated {
            let question = self.build_question(query, candidate);
            match self.store.insert_question(&question).await {
                Ok(()) => questions.push(question),
                Err(err) => {
                    warn!(error = %err, "failed to persist generated question, dropping it")
                }
            }
        }

        info!(
            total = questions.len(),
            requested = count,
            "question bank backfilled"
        );
        Ok(questions)
    }

    /// A single question that is always resolved: a stored match, a generated one, or
    /// finally a persisted canned question for the domain.
    pub async fn get_one_question(&self, query: &QuestionQuery) -> Result<Question, StoreError> {
        if let Some(question) = self.get_questions(query, 1).await?.into_iter().next() {
            return Ok(question);
        }

        // the generated question could not be persisted; retry once with a canned one
        let question = self.build_question(query, prompts::fallback_question(query.domain));
        self.store.insert_question(&question).await?;
        Ok(question)
    }

    pub async fn list(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StoreError> {
        self.store.find_questions(filter, LIST_LIMIT).await
    }

    pub async fn categories(&self, filter: &QuestionFilter) -> Result<Vec<String>, StoreError> {
        self.store.question_categories(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Question>, StoreError> {
        self.store.find_question(id).await
    }

    fn build_question(&self, query: &QuestionQuery, generated: GeneratedQuestion) -> Question {
        let category = generated
            .category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Question {
            id: uuid::Uuid::new_v4().to_string(),
            question_type: query.question_type,
            domain: query.domain,
            difficulty: query.difficulty,
            question: generated.question,
            tags: vec![
                query.question_type.to_string(),
                query.domain.to_string(),
                category.clone(),
            ],
            category,
            expected_answer_points: generated.expected_points,
            ai_prompt: generated
                .ai_prompt
                .unwrap_or_else(|| format!("Question about {}", query.domain)),
            time_limit: generated.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

fn asked_categories(excluded: &[String], found: &[Question]) -> Vec<String> {
    let mut asked = excluded.to_vec();
    for question in found {
        if !asked.contains(&question.category) {
            asked.push(question.category.clone());
        }
    }
    asked
}
