use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{Store, StoreError};
use crate::models::{Domain, Feedback, Interview, QuestionType};

/// The slice of an interview shown next to its feedback in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSummaryView {
    pub id: String,
    #[serde(rename = "type")]
    pub interview_type: QuestionType,
    pub domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u32>,
}

impl From<&Interview> for InterviewSummaryView {
    fn from(interview: &Interview) -> Self {
        Self {
            id: interview.id.clone(),
            interview_type: interview.interview_type,
            domain: interview.domain,
            completed_at: interview.completed_at,
            overall_score: interview.overall_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListItem {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub interview: Option<InterviewSummaryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetail {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub interview: Option<Interview>,
}

/// Feedback records of the user, newest first, joined with their interviews when present.
pub async fn list(store: &dyn Store, user_id: &str) -> Result<Vec<FeedbackListItem>, StoreError> {
    let records = store.list_feedback(user_id).await?;
    let mut items = Vec::with_capacity(records.len());
    for feedback in records {
        let interview = store
            .find_interview(&feedback.interview_id)
            .await?
            .map(|i| InterviewSummaryView::from(&i));
        items.push(FeedbackListItem {
            feedback,
            interview,
        });
    }
    Ok(items)
}

pub async fn for_interview(
    store: &dyn Store,
    interview_id: &str,
    user_id: &str,
) -> Result<Option<FeedbackDetail>, StoreError> {
    let Some(feedback) = store
        .find_feedback_by_interview(interview_id, user_id)
        .await?
    else {
        return Ok(None);
    };
    let interview = store.find_interview(interview_id).await?;
    Ok(Some(FeedbackDetail {
        feedback,
        interview,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{InterviewMode, OverallFeedback};

    fn record(interview_id: &str, user_id: &str, minutes_ago: i64) -> Feedback {
        Feedback {
            id: uuid::Uuid::new_v4().to_string(),
            interview_id: interview_id.to_string(),
            user_id: user_id.to_string(),
            question_responses: Vec::new(),
            overall_feedback: OverallFeedback {
                score: 70,
                strengths: Vec::new(),
                areas_for_improvement: Vec::new(),
                key_takeaways: String::new(),
                communication_skills: None,
            },
            generated_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn list_joins_interviews_newest_first() {
        let store = MemoryStore::new();
        let interview = Interview::new("u1", QuestionType::Technical, InterviewMode::Text, Domain::Design);
        store.insert_interview(&interview).await.unwrap();
        store.insert_feedback(&record(&interview.id, "u1", 10)).await.unwrap();
        store.insert_feedback(&record("gone", "u1", 1)).await.unwrap();
        store.insert_feedback(&record(&interview.id, "u2", 5)).await.unwrap();

        let items = list(&store, "u1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].feedback.interview_id, "gone");
        assert!(items[0].interview.is_none());
        assert_eq!(items[1].interview.as_ref().unwrap().domain, Domain::Design);

        let json = serde_json::to_value(&items[1]).unwrap();
        assert_eq!(json["interview"]["type"], "technical");
        assert_eq!(json["overallFeedback"]["score"], 70);
    }

    #[tokio::test]
    async fn feedback_is_scoped_to_owner() {
        let store = MemoryStore::new();
        store.insert_feedback(&record("i1", "u1", 0)).await.unwrap();
        assert!(for_interview(&store, "i1", "u1").await.unwrap().is_some());
        assert!(for_interview(&store, "i1", "u2").await.unwrap().is_none());
    }
}
