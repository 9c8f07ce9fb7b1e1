use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

string_enum!(QuestionType {
    Technical => "technical",
    Behavioral => "behavioral",
    DomainSpecific => "domain-specific",
});

string_enum!(Domain {
    SoftwareEngineering => "software-engineering",
    ProductManagement => "product-management",
    DataScience => "data-science",
    Design => "design",
    Marketing => "marketing",
    General => "general",
});

string_enum!(Difficulty {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

string_enum!(InterviewMode {
    Text => "text",
    Audio => "audio",
    Video => "video",
});

string_enum!(InterviewStatus {
    InProgress => "in-progress",
    Completed => "completed",
    Abandoned => "abandoned",
});

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 300;
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub domain: Domain,
    pub difficulty: Difficulty,
    pub question: String,
    pub category: String,
    #[serde(default)]
    pub expected_answer_points: Vec<String>,
    #[serde(default)]
    pub ai_prompt: String,
    pub time_limit: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The slice of a question handed out by next-question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question_id: String,
    pub question: String,
    pub category: String,
    pub time_limit: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            question_id: question.id.clone(),
            question: question.question.clone(),
            category: question.category.clone(),
            time_limit: question.time_limit,
            question_type: question.question_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationSkills {
    pub clarity: u32,
    pub structure: u32,
    pub confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub ai_analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<CommunicationSkills>,
}

/// One question/answer exchange recorded inside an interview.
///
/// The question text, category and limit are a snapshot taken when the attempt was
/// recorded, so later edits to the question bank never rewrite past interviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAttempt {
    pub question_id: String,
    pub question: String,
    pub category: String,
    pub time_limit: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<AttemptFeedback>,
    pub timestamp: DateTime<Utc>,
}

impl QuestionAttempt {
    pub fn snapshot(question: &Question, order: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            question_id: question.id.clone(),
            question: question.question.clone(),
            category: question.category.clone(),
            time_limit: question.time_limit,
            question_type: question.question_type,
            order,
            answer: None,
            audio_url: None,
            video_url: None,
            duration: None,
            feedback: None,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFeedback {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub detailed_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub interview_type: QuestionType,
    pub mode: InterviewMode,
    pub domain: Domain,
    pub status: InterviewStatus,
    #[serde(default)]
    pub questions: Vec<QuestionAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<InterviewFeedback>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<i64>,
}

impl Interview {
    pub fn new(
        user_id: impl Into<String>,
        interview_type: QuestionType,
        mode: InterviewMode,
        domain: Domain,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            interview_type,
            mode,
            domain,
            status: InterviewStatus::InProgress,
            questions: Vec::new(),
            overall_score: None,
            feedback: None,
            started_at: Utc::now(),
            completed_at: None,
            total_duration: None,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Copy suitable for history listings: answer text is stripped from every attempt.
    pub fn without_answers(&self) -> Self {
        let mut copy = self.clone();
        for attempt in &mut copy.questions {
            attempt.answer = None;
        }
        copy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question_id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<AttemptFeedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallFeedback {
    pub score: u32,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub key_takeaways: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_skills: Option<CommunicationSkills>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub interview_id: String,
    pub user_id: String,
    pub question_responses: Vec<QuestionResponse>,
    pub overall_feedback: OverallFeedback,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub interview_id: String,
    #[serde(rename = "type")]
    pub interview_type: QuestionType,
    pub domain: Domain,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub total: u32,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub action: String,
    pub date: DateTime<Utc>,
    pub details: String,
}

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: String,
    pub user_id: String,
    pub total_interviews: u32,
    pub completed_interviews: u32,
    pub average_score: u32,
    #[serde(default)]
    pub interview_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub skill_progress: BTreeMap<QuestionType, SkillProgress>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityEntry>,
    pub last_updated: DateTime<Utc>,
}

/// Atomic update applied to an existing progress record.
///
/// Counters are incremented by one, `average_score` and the skill entry are overwritten,
/// history is appended and activity is appended then cut to the newest
/// [`RECENT_ACTIVITY_LIMIT`] entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub average_score: u32,
    pub skill_type: QuestionType,
    pub skill: SkillProgress,
    pub history: HistoryEntry,
    pub activity: ActivityEntry,
    pub updated_at: DateTime<Utc>,
}

impl ProgressUpdate {
    pub fn apply_to(&self, progress: &mut Progress) {
        progress.total_interviews += 1;
        progress.completed_interviews += 1;
        progress.average_score = self.average_score;
        progress.skill_progress.insert(self.skill_type, self.skill);
        progress.interview_history.push(self.history.clone());
        progress.recent_activity.push(self.activity.clone());
        let overflow = progress
            .recent_activity
            .len()
            .saturating_sub(RECENT_ACTIVITY_LIMIT);
        progress.recent_activity.drain(..overflow);
        progress.last_updated = self.updated_at;
    }
}
