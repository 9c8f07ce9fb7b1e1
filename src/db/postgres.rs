use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::db::config::DbConfig;
use crate::db::migrate::{run_migrations, MigrationError};
use crate::db::{QuestionFilter, Store, StoreError};
use crate::models::{
    ActivityEntry, Feedback, HistoryEntry, Interview, InterviewFeedback,
    InterviewStatus, OverallFeedback, Progress, ProgressUpdate, Question, QuestionAttempt,
    QuestionResponse, QuestionType, SkillProgress, RECENT_ACTIVITY_LIMIT,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum PgInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl PgStore {
    pub async fn connect(config: &DbConfig) -> Result<Self, PgInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.primary_url)
            .await?;

        if config.run_migrations {
            run_migrations(&pool).await?;
        }

        Ok(Self { pool })
    }
}

const QUESTION_COLUMNS: &str = r#"
    "id", "type", "domain", "difficulty", "question", "category", "expectedAnswerPoints",
    "aiPrompt", "timeLimit", "tags", "isActive", "createdAt"
"#;

const INTERVIEW_COLUMNS: &str = r#"
    "id", "userId", "type", "mode", "domain", "status", "questions", "overallScore",
    "feedback", "startedAt", "completedAt", "totalDuration"
"#;

const FEEDBACK_COLUMNS: &str = r#"
    "id", "interviewId", "userId", "questionResponses", "overallFeedback", "generatedAt"
"#;

const PROGRESS_COLUMNS: &str = r#"
    "id", "userId", "totalInterviews", "completedInterviews", "averageScore",
    "interviewHistory", "skillProgress", "recentActivity", "lastUpdated"
"#;

fn push_question_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    builder.push(r#" WHERE "isActive" = TRUE"#);
    if let Some(question_type) = filter.question_type {
        builder
            .push(r#" AND "type" = "#)
            .push_bind(question_type.as_str());
    }
    if let Some(domain) = filter.domain {
        builder.push(r#" AND "domain" = "#).push_bind(domain.as_str());
    }
    if let Some(difficulty) = filter.difficulty {
        builder
            .push(r#" AND "difficulty" = "#)
            .push_bind(difficulty.as_str());
    }
    if let Some(category) = &filter.category {
        builder.push(r#" AND "category" = "#).push_bind(category.clone());
    }
    if !filter.exclude_ids.is_empty() {
        builder
            .push(r#" AND NOT ("id" = ANY("#)
            .push_bind(filter.exclude_ids.clone())
            .push("))");
    }
    if !filter.exclude_categories.is_empty() {
        builder
            .push(r#" AND NOT ("category" = ANY("#)
            .push_bind(filter.exclude_categories.clone())
            .push("))");
    }
}

fn parse_column<T>(row: &PgRow, entity: &'static str, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|err| StoreError::Corrupt {
        entity,
        id: row.try_get::<String, _>("id").unwrap_or_default(),
        reason: err.to_string(),
    })
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn map_question(row: &PgRow) -> Result<Question, StoreError> {
    let expected: Json<Vec<String>> = row.try_get("expectedAnswerPoints")?;
    let tags: Json<Vec<String>> = row.try_get("tags")?;
    let time_limit: i32 = row.try_get("timeLimit")?;
    Ok(Question {
        id: row.try_get("id")?,
        question_type: parse_column(row, "question", "type")?,
        domain: parse_column(row, "question", "domain")?,
        difficulty: parse_column(row, "question", "difficulty")?,
        question: row.try_get("question")?,
        category: row.try_get("category")?,
        expected_answer_points: expected.0,
        ai_prompt: row.try_get("aiPrompt")?,
        time_limit: non_negative(time_limit),
        tags: tags.0,
        is_active: row.try_get("isActive")?,
        created_at: row.try_get("createdAt")?,
    })
}

fn map_interview(row: &PgRow) -> Result<Interview, StoreError> {
    let questions: Json<Vec<QuestionAttempt>> = row.try_get("questions")?;
    let feedback: Option<Json<InterviewFeedback>> = row.try_get("feedback")?;
    let overall_score: Option<i32> = row.try_get("overallScore")?;
    Ok(Interview {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        interview_type: parse_column(row, "interview", "type")?,
        mode: parse_column(row, "interview", "mode")?,
        domain: parse_column(row, "interview", "domain")?,
        status: parse_column(row, "interview", "status")?,
        questions: questions.0,
        overall_score: overall_score.map(non_negative),
        feedback: feedback.map(|json| json.0),
        started_at: row.try_get("startedAt")?,
        completed_at: row.try_get("completedAt")?,
        total_duration: row.try_get("totalDuration")?,
    })
}

fn map_feedback(row: &PgRow) -> Result<Feedback, StoreError> {
    let responses: Json<Vec<QuestionResponse>> = row.try_get("questionResponses")?;
    let overall: Json<OverallFeedback> = row.try_get("overallFeedback")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        interview_id: row.try_get("interviewId")?,
        user_id: row.try_get("userId")?,
        question_responses: responses.0,
        overall_feedback: overall.0,
        generated_at: row.try_get("generatedAt")?,
    })
}

fn map_progress(row: &PgRow) -> Result<Progress, StoreError> {
    let history: Json<Vec<HistoryEntry>> = row.try_get("interviewHistory")?;
    let skills: Json<BTreeMap<QuestionType, SkillProgress>> = row.try_get("skillProgress")?;
    let activity: Json<Vec<ActivityEntry>> = row.try_get("recentActivity")?;
    Ok(Progress {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        total_interviews: non_negative(row.try_get("totalInterviews")?),
        completed_interviews: non_negative(row.try_get("completedInterviews")?),
        average_score: non_negative(row.try_get("averageScore")?),
        interview_history: history.0,
        skill_progress: skills.0,
        recent_activity: activity.0,
        last_updated: row.try_get("lastUpdated")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn find_questions(
        &self,
        filter: &QuestionFilter,
        limit: usize,
    ) -> Result<Vec<Question>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(QUESTION_COLUMNS).push(r#" FROM "questions""#);
        push_question_filter(&mut builder, filter);
        builder
            .push(r#" ORDER BY "createdAt" ASC LIMIT "#)
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_question).collect()
    }

    async fn find_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let sql = format!(r#"SELECT {QUESTION_COLUMNS} FROM "questions" WHERE "id" = $1"#);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_question).transpose()
    }

    async fn insert_question(&self, question: &Question) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "questions" (
                "id", "type", "domain", "difficulty", "question", "category",
                "expectedAnswerPoints", "aiPrompt", "timeLimit", "tags", "isActive", "createdAt"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&question.id)
        .bind(question.question_type.as_str())
        .bind(question.domain.as_str())
        .bind(question.difficulty.as_str())
        .bind(&question.question)
        .bind(&question.category)
        .bind(Json(&question.expected_answer_points))
        .bind(&question.ai_prompt)
        .bind(i32::try_from(question.time_limit).unwrap_or(i32::MAX))
        .bind(Json(&question.tags))
        .bind(question.is_active)
        .bind(question.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn question_categories(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<String>, StoreError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(r#"SELECT DISTINCT "category" FROM "questions""#);
        push_question_filter(&mut builder, filter);
        builder.push(r#" ORDER BY "category""#);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("category").map_err(StoreError::from))
            .collect()
    }

    async fn insert_interview(&self, interview: &Interview) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "interviews" (
                "id", "userId", "type", "mode", "domain", "status", "questions",
                "overallScore", "feedback", "startedAt", "completedAt", "totalDuration"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&interview.id)
        .bind(&interview.user_id)
        .bind(interview.interview_type.as_str())
        .bind(interview.mode.as_str())
        .bind(interview.domain.as_str())
        .bind(interview.status.as_str())
        .bind(Json(&interview.questions))
        .bind(interview.overall_score.map(|s| s as i32))
        .bind(interview.feedback.as_ref().map(Json))
        .bind(interview.started_at)
        .bind(interview.completed_at)
        .bind(interview.total_duration)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_interview(&self, interview: &Interview) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE "interviews" SET
                "status" = $2,
                "questions" = $3,
                "overallScore" = $4,
                "feedback" = $5,
                "completedAt" = $6,
                "totalDuration" = $7
            WHERE "id" = $1
            "#,
        )
        .bind(&interview.id)
        .bind(interview.status.as_str())
        .bind(Json(&interview.questions))
        .bind(interview.overall_score.map(|s| s as i32))
        .bind(interview.feedback.as_ref().map(Json))
        .bind(interview.completed_at)
        .bind(interview.total_duration)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Custom(format!(
                "interview {} does not exist",
                interview.id
            )));
        }
        Ok(())
    }

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, StoreError> {
        let sql = format!(r#"SELECT {INTERVIEW_COLUMNS} FROM "interviews" WHERE "id" = $1"#);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_interview).transpose()
    }

    async fn list_interviews(
        &self,
        user_id: &str,
        status: Option<InterviewStatus>,
    ) -> Result<Vec<Interview>, StoreError> {
        let sql = format!(
            r#"
            SELECT {INTERVIEW_COLUMNS} FROM "interviews"
            WHERE "userId" = $1 AND ($2::text IS NULL OR "status" = $2)
            ORDER BY "startedAt" DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_interview).collect()
    }

    async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "feedback" (
                "id", "interviewId", "userId", "questionResponses", "overallFeedback", "generatedAt"
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&feedback.id)
        .bind(&feedback.interview_id)
        .bind(&feedback.user_id)
        .bind(Json(&feedback.question_responses))
        .bind(Json(&feedback.overall_feedback))
        .bind(feedback.generated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_feedback_by_interview(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        let sql = format!(
            r#"
            SELECT {FEEDBACK_COLUMNS} FROM "feedback"
            WHERE "interviewId" = $1 AND "userId" = $2
            ORDER BY "generatedAt" ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(interview_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_feedback).transpose()
    }

    async fn list_feedback(&self, user_id: &str) -> Result<Vec<Feedback>, StoreError> {
        let sql = format!(
            r#"SELECT {FEEDBACK_COLUMNS} FROM "feedback" WHERE "userId" = $1 ORDER BY "generatedAt" DESC"#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_feedback).collect()
    }

    async fn find_progress(&self, user_id: &str) -> Result<Option<Progress>, StoreError> {
        let sql = format!(r#"SELECT {PROGRESS_COLUMNS} FROM "progress" WHERE "userId" = $1"#);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_progress).transpose()
    }

    async fn insert_progress(&self, progress: &Progress) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO "progress" (
                "id", "userId", "totalInterviews", "completedInterviews", "averageScore",
                "interviewHistory", "skillProgress", "recentActivity", "lastUpdated"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT ("userId") DO NOTHING
            "#,
        )
        .bind(&progress.id)
        .bind(&progress.user_id)
        .bind(progress.total_interviews as i32)
        .bind(progress.completed_interviews as i32)
        .bind(progress.average_score as i32)
        .bind(Json(&progress.interview_history))
        .bind(Json(&progress.skill_progress))
        .bind(Json(&progress.recent_activity))
        .bind(progress.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_progress_update(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE "progress" SET
                "totalInterviews" = "totalInterviews" + 1,
                "completedInterviews" = "completedInterviews" + 1,
                "averageScore" = $2,
                "skillProgress" = jsonb_set("skillProgress", ARRAY[$3::text], $4::jsonb, TRUE),
                "interviewHistory" = "interviewHistory" || jsonb_build_array($5::jsonb),
                "recentActivity" = (
                    SELECT COALESCE(jsonb_agg(kept.entry ORDER BY kept.ord), '[]'::jsonb)
                    FROM (
                        SELECT entry, ord
                        FROM jsonb_array_elements("recentActivity" || jsonb_build_array($6::jsonb))
                            WITH ORDINALITY AS appended(entry, ord)
                        ORDER BY ord DESC
                        LIMIT $7
                    ) AS kept
                ),
                "lastUpdated" = $8
            WHERE "userId" = $1
            "#,
        )
        .bind(user_id)
        .bind(update.average_score as i32)
        .bind(update.skill_type.as_str())
        .bind(Json(&update.skill))
        .bind(Json(&update.history))
        .bind(Json(&update.activity))
        .bind(RECENT_ACTIVITY_LIMIT as i64)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
