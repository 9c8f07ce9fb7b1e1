//! Per-user progress aggregation and the read models built on completed interviews.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Store, StoreError};
use crate::models::{
    ActivityEntry, HistoryEntry, Interview, InterviewStatus, Progress, ProgressUpdate,
    QuestionType, SkillProgress,
};

const SCORE_TREND_LEN: usize = 10;
const RECENT_SCORES_LEN: usize = 5;

/// Weighted incremental mean. Intermediate rounding is kept on purpose: it is what the stored
/// averages have always been computed with.
pub fn next_average(previous_average: u32, previous_total: u32, score: u32) -> u32 {
    let total = u64::from(previous_total) + 1;
    let sum = u64::from(previous_average) * u64::from(previous_total) + u64::from(score);
    rounded_mean(sum, total)
}

pub(crate) fn rounded_mean(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u32
}

fn history_entry(interview: &Interview) -> HistoryEntry {
    HistoryEntry {
        interview_id: interview.id.clone(),
        interview_type: interview.interview_type,
        domain: interview.domain,
        score: interview.overall_score.unwrap_or(0),
        date: interview.completed_at,
    }
}

fn activity_entry(interview: &Interview, now: DateTime<Utc>) -> ActivityEntry {
    ActivityEntry {
        action: format!("Completed {} interview", interview.interview_type),
        date: now,
        details: format!("Score: {}/100", interview.overall_score.unwrap_or(0)),
    }
}

fn seeded_progress(user_id: &str, interview: &Interview, now: DateTime<Utc>) -> Progress {
    let score = interview.overall_score.unwrap_or(0);
    Progress {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        total_interviews: 1,
        completed_interviews: 1,
        average_score: score,
        interview_history: vec![history_entry(interview)],
        skill_progress: BTreeMap::from([(
            interview.interview_type,
            SkillProgress { total: 1, score },
        )]),
        recent_activity: vec![activity_entry(interview, now)],
        last_updated: now,
    }
}

/// Update that folds one more completed interview into `existing`.
pub fn completion_update(
    existing: &Progress,
    interview: &Interview,
    now: DateTime<Utc>,
) -> ProgressUpdate {
    let score = interview.overall_score.unwrap_or(0);
    let skill = existing
        .skill_progress
        .get(&interview.interview_type)
        .copied()
        .unwrap_or_default();

    ProgressUpdate {
        average_score: next_average(existing.average_score, existing.total_interviews, score),
        skill_type: interview.interview_type,
        skill: SkillProgress {
            total: skill.total + 1,
            score: next_average(skill.score, skill.total, score),
        },
        history: history_entry(interview),
        activity: activity_entry(interview, now),
        updated_at: now,
    }
}

/// Folds a completed interview into the user's progress record, creating it on first use.
///
/// Not idempotent: recording the same interview twice counts it twice.
pub async fn record_completion(
    store: &dyn Store,
    user_id: &str,
    interview: &Interview,
) -> Result<(), StoreError> {
    let now = Utc::now();

    let existing = match store.find_progress(user_id).await? {
        Some(existing) => existing,
        None => {
            if store
                .insert_progress(&seeded_progress(user_id, interview, now))
                .await?
            {
                info!(user_id, interview_id = %interview.id, "progress record created");
                return Ok(());
            }
            // another completion created the record first
            store
                .find_progress(user_id)
                .await?
                .ok_or_else(|| StoreError::Custom(format!("progress for {user_id} vanished")))?
        }
    };

    let update = completion_update(&existing, interview, now);
    if !store.apply_progress_update(user_id, &update).await? {
        return Err(StoreError::Custom(format!(
            "progress for {user_id} vanished during update"
        )));
    }
    debug!(
        user_id,
        interview_id = %interview.id,
        average_score = update.average_score,
        "progress updated"
    );
    Ok(())
}

/// Progress for `user_id`, rebuilt from completed interviews when no record exists yet.
pub async fn get_progress(store: &dyn Store, user_id: &str) -> Result<Progress, StoreError> {
    if let Some(progress) = store.find_progress(user_id).await? {
        return Ok(progress);
    }

    let completed = completed_chronological(store, user_id).await?;
    let count = completed.len() as u32;
    let total_score: u64 = completed
        .iter()
        .map(|i| u64::from(i.overall_score.unwrap_or(0)))
        .sum();

    let progress = Progress {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        total_interviews: count,
        completed_interviews: count,
        average_score: rounded_mean(total_score, u64::from(count)),
        interview_history: completed.iter().map(history_entry).collect(),
        skill_progress: BTreeMap::new(),
        recent_activity: Vec::new(),
        last_updated: Utc::now(),
    };

    if store.insert_progress(&progress).await? {
        info!(user_id, interviews = count, "progress backfilled from history");
        return Ok(progress);
    }
    store
        .find_progress(user_id)
        .await?
        .ok_or_else(|| StoreError::Custom(format!("progress for {user_id} vanished")))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBucket {
    pub count: u32,
    pub total_score: u64,
    pub avg_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentScore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub score: u32,
    #[serde(rename = "type")]
    pub interview_type: QuestionType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_interviews: u32,
    pub by_type: BTreeMap<String, ScoreBucket>,
    pub by_domain: BTreeMap<String, ScoreBucket>,
    pub score_trend: Vec<TrendPoint>,
    pub recent_scores: Vec<RecentScore>,
}

pub async fn stats(store: &dyn Store, user_id: &str) -> Result<ProgressStats, StoreError> {
    let completed = completed_chronological(store, user_id).await?;
    Ok(build_stats(&completed))
}

pub fn build_stats(completed: &[Interview]) -> ProgressStats {
    let mut by_type: BTreeMap<String, ScoreBucket> = BTreeMap::new();
    let mut by_domain: BTreeMap<String, ScoreBucket> = BTreeMap::new();

    for interview in completed {
        let score = u64::from(interview.overall_score.unwrap_or(0));
        for bucket in [
            by_type
                .entry(interview.interview_type.to_string())
                .or_default(),
            by_domain.entry(interview.domain.to_string()).or_default(),
        ] {
            bucket.count += 1;
            bucket.total_score += score;
        }
    }
    for bucket in by_type.values_mut().chain(by_domain.values_mut()) {
        bucket.avg_score = rounded_mean(bucket.total_score, u64::from(bucket.count));
    }

    ProgressStats {
        total_interviews: completed.len() as u32,
        by_type,
        by_domain,
        score_trend: tail(completed, SCORE_TREND_LEN)
            .iter()
            .map(|i| TrendPoint {
                date: i.completed_at,
                score: i.overall_score.unwrap_or(0),
            })
            .collect(),
        recent_scores: tail(completed, RECENT_SCORES_LEN)
            .iter()
            .map(|i| RecentScore {
                date: i.completed_at,
                score: i.overall_score.unwrap_or(0),
                interview_type: i.interview_type,
            })
            .collect(),
    }
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

async fn completed_chronological(
    store: &dyn Store,
    user_id: &str,
) -> Result<Vec<Interview>, StoreError> {
    let mut completed = store
        .list_interviews(user_id, Some(InterviewStatus::Completed))
        .await?;
    completed.sort_by_key(|i| i.completed_at.unwrap_or(i.started_at));
    Ok(completed)
}
