//! Interview lifecycle: start, serve questions, take answers, complete.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Store, StoreError};
use crate::models::{
    Difficulty, Domain, Feedback, Interview, InterviewFeedback, InterviewMode, InterviewStatus,
    OverallFeedback, QuestionAttempt, QuestionResponse, QuestionType, QuestionView,
};
use crate::services::ai::prompts::{self, AnswerEvaluation, InterviewSummary};
use crate::services::ai::AiGateway;
use crate::services::progress::rounded_mean;
use crate::services::question_bank::{QuestionBank, QuestionQuery};
use crate::workers::ProgressWorker;

pub const DEFAULT_NUM_QUESTIONS: u32 = 5;
pub const MAX_NUM_QUESTIONS: u32 = 20;

const GENERATION_DIFFICULTY: Difficulty = Difficulty::Medium;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct NewInterview {
    pub interview_type: Option<QuestionType>,
    pub mode: Option<InterviewMode>,
    pub domain: Option<Domain>,
    pub num_questions: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct AnswerSubmission {
    pub question_id: Option<String>,
    pub answer: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub feedback: AnswerEvaluation,
    pub question_number: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedInterview {
    pub id: String,
    pub overall_score: u32,
    pub total_questions: usize,
    pub duration: i64,
    pub feedback: InterviewFeedback,
}

#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn Store>,
    ai: AiGateway,
    bank: QuestionBank,
    progress: ProgressWorker,
}

impl InterviewService {
    pub fn new(store: Arc<dyn Store>, ai: AiGateway, progress: ProgressWorker) -> Self {
        let bank = QuestionBank::new(store.clone(), ai.clone());
        Self {
            store,
            ai,
            bank,
            progress,
        }
    }

    pub async fn start(&self, user_id: &str, request: NewInterview) -> Result<Interview, InterviewError> {
        let (Some(interview_type), Some(mode), Some(domain)) =
            (request.interview_type, request.mode, request.domain)
        else {
            return Err(InterviewError::Validation(
                "Missing required fields: type, mode, and domain are required".to_string(),
            ));
        };
        let count = request.num_questions.unwrap_or(DEFAULT_NUM_QUESTIONS);
        if !(1..=MAX_NUM_QUESTIONS).contains(&count) {
            return Err(InterviewError::Validation(format!(
                "numQuestions must be between 1 and {MAX_NUM_QUESTIONS}"
            )));
        }

        let mut interview = Interview::new(user_id, interview_type, mode, domain);
        self.store.insert_interview(&interview).await?;
        info!(interview_id = %interview.id, user_id, %interview_type, %domain, "interview created");

        let query = QuestionQuery::new(interview_type, domain, GENERATION_DIFFICULTY);
        let questions = self.bank.get_questions(&query, count as usize).await?;
        let now = Utc::now();
        interview.questions = questions
            .iter()
            .enumerate()
            .map(|(order, question)| QuestionAttempt::snapshot(question, order as u32, now))
            .collect();
        self.store.save_interview(&interview).await?;

        info!(
            interview_id = %interview.id,
            questions = interview.questions.len(),
            "interview started"
        );
        Ok(interview)
    }

    /// Next question not yet part of the interview, avoiding categories already asked.
    ///
    /// The question is not recorded on the interview until an answer is submitted for it.
    pub async fn next_question(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<QuestionView, InterviewError> {
        let interview = self.owned(interview_id, user_id).await?;

        let mut query =
            QuestionQuery::new(interview.interview_type, interview.domain, GENERATION_DIFFICULTY);
        for attempt in &interview.questions {
            query.exclude_ids.push(attempt.question_id.clone());
            if !attempt.category.is_empty() && !query.exclude_categories.contains(&attempt.category)
            {
                query.exclude_categories.push(attempt.category.clone());
            }
        }

        let question = self.bank.get_one_question(&query).await?;
        Ok(QuestionView::from(&question))
    }

    /// Evaluates an answer and appends it, with its feedback, as a new attempt.
    pub async fn submit_answer(
        &self,
        interview_id: &str,
        user_id: &str,
        submission: AnswerSubmission,
    ) -> Result<SubmittedAnswer, InterviewError> {
        let mut interview = self.owned(interview_id, user_id).await?;

        let question_id = submission
            .question_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| InterviewError::Validation("questionId is required".to_string()))?;
        let question = self
            .store
            .find_question(&question_id)
            .await?
            .ok_or(InterviewError::NotFound("Question"))?;

        let answer_text = submission.answer.as_deref().unwrap_or_default();
        let evaluation = prompts::evaluate_answer(
            &self.ai,
            &question.question,
            answer_text,
            interview.interview_type,
            interview.domain,
        )
        .await;

        let mut attempt =
            QuestionAttempt::snapshot(&question, interview.questions.len() as u32, Utc::now());
        attempt.answer = submission.answer;
        attempt.audio_url = submission.audio_url;
        attempt.video_url = submission.video_url;
        attempt.duration = submission.duration;
        attempt.feedback = Some(evaluation.to_attempt_feedback());
        interview.questions.push(attempt);

        self.store.save_interview(&interview).await?;
        info!(
            interview_id,
            question_id = %question.id,
            score = ?evaluation.score,
            "answer recorded"
        );

        Ok(SubmittedAnswer {
            feedback: evaluation,
            question_number: interview.questions.len(),
        })
    }

    /// Scores and closes the interview, stores its feedback record and queues the progress
    /// update. Completing an already completed interview runs again and counts again.
    pub async fn complete(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<CompletedInterview, InterviewError> {
        let mut interview = self.owned(interview_id, user_id).await?;
        if interview.status == InterviewStatus::Abandoned {
            return Err(InterviewError::Conflict(
                "Interview was abandoned and cannot be completed".to_string(),
            ));
        }

        let summary = prompts::request_summary(
            &self.ai,
            interview.interview_type,
            interview.domain,
            interview.questions.len(),
        )
        .await;
        let scores: Vec<u32> = interview
            .questions
            .iter()
            .filter_map(|q| q.feedback.as_ref().and_then(|f| f.score))
            .filter(|score| *score > 0)
            .collect();
        let (overall_score, summary) = resolve_overall(summary, &scores);

        let completed_at = Utc::now();
        interview.status = InterviewStatus::Completed;
        interview.completed_at = Some(completed_at);
        interview.total_duration = Some(
            ((completed_at - interview.started_at).num_milliseconds() as f64 / 1000.0).round()
                as i64,
        );
        interview.overall_score = Some(overall_score);
        let feedback = InterviewFeedback {
            strengths: summary.strengths.clone(),
            improvements: summary.areas_for_improvement.clone(),
            detailed_analysis: summary.key_takeaways.clone(),
        };
        interview.feedback = Some(feedback.clone());
        self.store.save_interview(&interview).await?;

        let record = Feedback {
            id: uuid::Uuid::new_v4().to_string(),
            interview_id: interview.id.clone(),
            user_id: user_id.to_string(),
            question_responses: interview
                .questions
                .iter()
                .map(|q| QuestionResponse {
                    question_id: q.question_id.clone(),
                    question: q.question.clone(),
                    answer: q.answer.clone(),
                    feedback: q.feedback.clone(),
                })
                .collect(),
            overall_feedback: OverallFeedback {
                score: overall_score,
                strengths: summary.strengths,
                areas_for_improvement: summary.areas_for_improvement,
                key_takeaways: summary.key_takeaways,
                communication_skills: summary.communication,
            },
            generated_at: completed_at,
        };
        self.store.insert_feedback(&record).await?;

        info!(interview_id, user_id, overall_score, "interview completed");
        self.progress.enqueue(user_id, interview.clone());

        Ok(CompletedInterview {
            id: interview.id,
            overall_score,
            total_questions: interview.questions.len(),
            duration: interview.total_duration.unwrap_or_default(),
            feedback,
        })
    }

    pub async fn get(&self, interview_id: &str, user_id: &str) -> Result<Interview, InterviewError> {
        self.owned(interview_id, user_id).await
    }

    /// All interviews of the user, newest first, without answer text.
    pub async fn history(&self, user_id: &str) -> Result<Vec<Interview>, InterviewError> {
        let interviews = self.store.list_interviews(user_id, None).await?;
        Ok(interviews.iter().map(Interview::without_answers).collect())
    }

    async fn owned(&self, interview_id: &str, user_id: &str) -> Result<Interview, InterviewError> {
        match self.store.find_interview(interview_id).await? {
            Some(interview) if interview.is_owned_by(user_id) => Ok(interview),
            _ => Err(InterviewError::NotFound("Interview")),
        }
    }
}

/// Overall score and summary copy for a completed interview.
///
/// A non-zero score from the summary wins, otherwise the rounded mean of the per-question
/// scores. Without a summary the canned copy is used, and its score only when nothing was
/// scored.
fn resolve_overall(summary: Option<InterviewSummary>, scores: &[u32]) -> (u32, InterviewSummary) {
    let average = rounded_mean(
        scores.iter().map(|s| u64::from(*s)).sum(),
        scores.len() as u64,
    );
    match summary {
        Some(summary) => {
            let score = summary.overall_score.filter(|s| *s > 0).unwrap_or(average);
            (score, summary)
        }
        None => {
            warn!("interview summary unavailable, using fallback copy");
            let fallback = prompts::fallback_summary();
            let score = if scores.is_empty() {
                fallback.overall_score.unwrap_or_default()
            } else {
                average
            };
            (score, fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(score: Option<u32>) -> InterviewSummary {
        InterviewSummary {
            overall_score: score,
            summary: "ok".to_string(),
            strengths: vec!["Clear".to_string()],
            areas_for_improvement: Vec::new(),
            key_takeaways: "Keep going".to_string(),
            next_steps: Vec::new(),
            communication: None,
        }
    }

    #[test]
    fn summary_score_wins_when_present() {
        let (score, copy) = resolve_overall(Some(summary(Some(91))), &[80, 60]);
        assert_eq!(score, 91);
        assert_eq!(copy.key_takeaways, "Keep going");
    }

    #[test]
    fn zero_or_missing_summary_score_uses_average() {
        assert_eq!(resolve_overall(Some(summary(Some(0))), &[80, 61]).0, 71);
        assert_eq!(resolve_overall(Some(summary(None)), &[80, 60]).0, 70);
        assert_eq!(resolve_overall(Some(summary(None)), &[]).0, 0);
    }

    #[test]
    fn missing_summary_falls_back() {
        let (score, copy) = resolve_overall(None, &[80, 60]);
        assert_eq!(score, 70);
        assert_eq!(copy.summary, "Good performance overall.");

        let (score, _) = resolve_overall(None, &[]);
        assert_eq!(score, 75);
    }
}
