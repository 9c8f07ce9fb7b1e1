//! Runs against a real Postgres when `DATABASE_URL` is set; skipped otherwise.
//! Kept to a single test so migrations are applied by one connection.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use mock_interview_backend::db::config::DbConfig;
use mock_interview_backend::db::{PgStore, Store};
use mock_interview_backend::models::{
    ActivityEntry, Domain, HistoryEntry, Progress, ProgressUpdate, QuestionType, SkillProgress,
    RECENT_ACTIVITY_LIMIT,
};

async fn connect() -> Option<PgStore> {
    let Ok(config) = DbConfig::from_env() else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };
    Some(PgStore::connect(&config).await.unwrap())
}

fn empty_progress(user_id: &str) -> Progress {
    Progress {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        total_interviews: 0,
        completed_interviews: 0,
        average_score: 0,
        interview_history: Vec::new(),
        skill_progress: BTreeMap::new(),
        recent_activity: Vec::new(),
        last_updated: Utc::now(),
    }
}

fn update(step: u32) -> ProgressUpdate {
    let at = Utc::now() + Duration::seconds(i64::from(step));
    ProgressUpdate {
        average_score: 50 + step,
        skill_type: QuestionType::Technical,
        skill: SkillProgress {
            total: step + 1,
            score: 60 + step,
        },
        history: HistoryEntry {
            interview_id: format!("interview-{step}"),
            interview_type: QuestionType::Technical,
            domain: Domain::General,
            score: 60 + step,
            date: Some(at),
        },
        activity: ActivityEntry {
            action: "Completed technical interview".to_string(),
            date: at,
            details: format!("Score: {step}/100"),
        },
        updated_at: at,
    }
}

#[tokio::test]
async fn progress_updates_cap_activity_and_overwrite_skills() {
    let Some(store) = connect().await else {
        return;
    };
    let user_id = format!("pg-test-{}", uuid::Uuid::new_v4());

    assert!(!store.apply_progress_update(&user_id, &update(0)).await.unwrap());
    assert!(store.insert_progress(&empty_progress(&user_id)).await.unwrap());
    assert!(!store.insert_progress(&empty_progress(&user_id)).await.unwrap());

    let updates = 12;
    for step in 0..updates {
        assert!(store
            .apply_progress_update(&user_id, &update(step))
            .await
            .unwrap());
    }

    let progress = store.find_progress(&user_id).await.unwrap().unwrap();
    assert_eq!(progress.total_interviews, updates);
    assert_eq!(progress.completed_interviews, updates);
    assert_eq!(progress.average_score, 50 + updates - 1);
    assert_eq!(progress.interview_history.len(), updates as usize);
    assert_eq!(progress.interview_history[0].interview_id, "interview-0");

    let details: Vec<&str> = progress
        .recent_activity
        .iter()
        .map(|a| a.details.as_str())
        .collect();
    assert_eq!(details.len(), RECENT_ACTIVITY_LIMIT);
    let expected: Vec<String> = (updates - RECENT_ACTIVITY_LIMIT as u32..updates)
        .map(|step| format!("Score: {step}/100"))
        .collect();
    assert_eq!(details, expected);

    assert_eq!(
        progress.skill_progress.get(&QuestionType::Technical),
        Some(&SkillProgress {
            total: updates,
            score: 60 + updates - 1,
        })
    );
}
