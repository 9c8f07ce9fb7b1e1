//! Interview prompts sent through the [`AiGateway`] and the static copy used when the
//! gateway cannot produce usable output.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{
    AttemptFeedback, CommunicationSkills, Difficulty, Domain, QuestionType, DEFAULT_TIME_LIMIT_SECS,
};
use crate::services::ai::json::extract_as;
use crate::services::ai::AiGateway;

const QUESTION_MAX_TOKENS: u32 = 200;
const EVALUATION_MAX_TOKENS: u32 = 300;
const SUMMARY_MAX_TOKENS: u32 = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub category: Option<String>,
    pub expected_points: Vec<String>,
    pub time_limit: Option<u32>,
    pub ai_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "expectedAnswerPoints")]
    expected_points: Option<Vec<String>>,
    #[serde(default)]
    time_limit: Option<f64>,
    #[serde(default)]
    ai_prompt: Option<String>,
}

pub fn question_prompt(
    question_type: QuestionType,
    domain: Domain,
    difficulty: Difficulty,
    avoid_categories: &[String],
) -> String {
    let avoid = if avoid_categories.is_empty() {
        String::new()
    } else {
        format!("Avoid these topics: {}", avoid_categories.join(", "))
    };
    format!(
        "Generate exactly ONE {difficulty} level {question_type} interview question for {domain}.\n\
         {avoid}\n\n\
         JSON format only:\n\
         {{\"question\": \"your question\", \"category\": \"category name\", \"expectedPoints\": [\"point 1\", \"point 2\"], \"timeLimit\": 300}}"
    )
}

/// Asks the gateway for one new question. `None` when no provider produced a usable one.
pub async fn request_question(
    ai: &AiGateway,
    question_type: QuestionType,
    domain: Domain,
    difficulty: Difficulty,
    avoid_categories: &[String],
) -> Option<GeneratedQuestion> {
    let prompt = question_prompt(question_type, domain, difficulty, avoid_categories);
    let completion = match ai.complete(&prompt, QUESTION_MAX_TOKENS).await {
        Ok(completion) => completion,
        Err(failure) => {
            warn!(provider = failure.provider, error = %failure.message, "question generation failed");
            return None;
        }
    };

    let Some(payload) = extract_as::<QuestionPayload>(&completion.text) else {
        warn!(provider = completion.provider, "AI returned invalid question data");
        return None;
    };
    let question = payload.question.map(|q| q.trim().to_string()).unwrap_or_default();
    if question.is_empty() {
        warn!(provider = completion.provider, "AI question payload had no question text");
        return None;
    }

    Some(GeneratedQuestion {
        question,
        category: payload
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        expected_points: payload.expected_points.unwrap_or_default(),
        time_limit: payload
            .time_limit
            .filter(|t| t.is_finite() && *t >= 1.0)
            .map(|t| t.round() as u32),
        ai_prompt: payload.ai_prompt,
    })
}

/// [`request_question`], substituting a canned question when generation fails.
pub async fn generate_question(
    ai: &AiGateway,
    question_type: QuestionType,
    domain: Domain,
    difficulty: Difficulty,
    avoid_categories: &[String],
) -> GeneratedQuestion {
    match request_question(ai, question_type, domain, difficulty, avoid_categories).await {
        Some(question) => question,
        None => fallback_question(domain),
    }
}

struct FallbackTemplate {
    question: &'static str,
    category: &'static str,
    expected_points: &'static [&'static str],
    topic: &'static str,
}

const FALLBACK_QUESTIONS: [FallbackTemplate; 5] = [
    FallbackTemplate {
        question: "Describe a challenging project you worked on in {domain} and how you overcame obstacles.",
        category: "Projects",
        expected_points: &["Project context", "Challenges faced", "Solution approach", "Outcome"],
        topic: "Describe a challenging project.",
    },
    FallbackTemplate {
        question: "Tell me about a time you had to learn a new technology or skill quickly for {domain}.",
        category: "Learning",
        expected_points: &["Situation", "Learning approach", "Application", "Result"],
        topic: "Learning new skills.",
    },
    FallbackTemplate {
        question: "How do you prioritize tasks when working on multiple {domain} projects simultaneously?",
        category: "Time Management",
        expected_points: &["Prioritization strategy", "Examples", "Results"],
        topic: "Task prioritization.",
    },
    FallbackTemplate {
        question: "Describe a situation where you had a disagreement with a colleague regarding {domain} and how you resolved it.",
        category: "Collaboration",
        expected_points: &["Context", "Disagreement", "Resolution", "Outcome"],
        topic: "Conflict resolution.",
    },
    FallbackTemplate {
        question: "What are the most important skills for success in {domain} and why?",
        category: "Skills",
        expected_points: &["Key skills", "Why important", "Examples"],
        topic: "Important skills.",
    },
];

pub const FALLBACK_QUESTION_COUNT: usize = FALLBACK_QUESTIONS.len();

/// One of the canned questions, picked at random, with the domain substituted in.
pub fn fallback_question(domain: Domain) -> GeneratedQuestion {
    let index = rand::rng().random_range(0..FALLBACK_QUESTIONS.len());
    fallback_question_at(domain, index)
}

pub fn fallback_question_at(domain: Domain, index: usize) -> GeneratedQuestion {
    let template = &FALLBACK_QUESTIONS[index % FALLBACK_QUESTIONS.len()];
    GeneratedQuestion {
        question: template.question.replace("{domain}", domain.as_str()),
        category: Some(template.category.to_string()),
        expected_points: template
            .expected_points
            .iter()
            .map(|p| p.to_string())
            .collect(),
        time_limit: Some(DEFAULT_TIME_LIMIT_SECS),
        ai_prompt: Some(format!("Fallback question for {domain}: {}", template.topic)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication: Option<CommunicationSkills>,
}

impl AnswerEvaluation {
    pub fn to_attempt_feedback(&self) -> AttemptFeedback {
        AttemptFeedback {
            score: self.score,
            strengths: self.strengths.clone(),
            improvements: self.improvements.clone(),
            ai_analysis: self.analysis.clone(),
            communication: self.communication,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommunicationPayload {
    clarity: f64,
    structure: f64,
    confidence: f64,
}

impl CommunicationPayload {
    fn into_skills(self) -> CommunicationSkills {
        CommunicationSkills {
            clarity: clamp_score(self.clarity),
            structure: clamp_score(self.structure),
            confidence: clamp_score(self.confidence),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EvaluationPayload {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    communication: Option<CommunicationPayload>,
}

pub fn evaluation_prompt(
    question: &str,
    answer: &str,
    question_type: QuestionType,
    domain: Domain,
) -> String {
    format!(
        "Evaluate this {question_type} interview answer for {domain}.\n\n\
         Question: {question}\n\
         Answer: {answer}\n\n\
         JSON format only:\n\
         {{\"score\": 75, \"strengths\": [\"strength 1\"], \"improvements\": [\"improvement 1\"], \"analysis\": \"brief analysis\", \"communication\": {{\"clarity\": 75, \"structure\": 75, \"confidence\": 75}}}}"
    )
}

/// Scores one answer, substituting canned feedback when the gateway fails.
pub async fn evaluate_answer(
    ai: &AiGateway,
    question: &str,
    answer: &str,
    question_type: QuestionType,
    domain: Domain,
) -> AnswerEvaluation {
    let prompt = evaluation_prompt(question, answer, question_type, domain);
    let completion = match ai.complete(&prompt, EVALUATION_MAX_TOKENS).await {
        Ok(completion) => completion,
        Err(failure) => {
            warn!(provider = failure.provider, error = %failure.message, "answer evaluation failed, using fallback feedback");
            return fallback_evaluation();
        }
    };

    match extract_as::<EvaluationPayload>(&completion.text) {
        Some(payload) => AnswerEvaluation {
            score: payload
                .score
                .filter(|s| s.is_finite())
                .map(clamp_score),
            strengths: payload.strengths,
            improvements: payload.improvements,
            analysis: payload.analysis,
            communication: payload.communication.map(CommunicationPayload::into_skills),
        },
        None => {
            warn!(provider = completion.provider, "AI evaluation unparseable, using fallback feedback");
            fallback_evaluation()
        }
    }
}

pub fn fallback_evaluation() -> AnswerEvaluation {
    AnswerEvaluation {
        score: Some(70),
        strengths: vec!["Good response".to_string()],
        improvements: vec!["Add more details".to_string()],
        analysis: "Consider providing concrete examples.".to_string(),
        communication: Some(CommunicationSkills {
            clarity: 70,
            structure: 70,
            confidence: 70,
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSummary {
    pub overall_score: Option<u32>,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub key_takeaways: String,
    pub next_steps: Vec<String>,
    pub communication: Option<CommunicationSkills>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryPayload {
    #[serde(default)]
    overall_score: Option<f64>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    #[serde(default)]
    key_takeaways: String,
    #[serde(default)]
    next_steps: Vec<String>,
    #[serde(default)]
    communication: Option<CommunicationPayload>,
}

pub fn summary_prompt(question_type: QuestionType, domain: Domain, question_count: usize) -> String {
    format!(
        "Generate interview feedback summary.\n\n\
         Type: {question_type}, Domain: {domain}\n\
         Questions: {question_count}\n\n\
         JSON format:\n\
         {{\"overallScore\": 75, \"summary\": \"brief summary\", \"strengths\": [\"strength 1\"], \"areasForImprovement\": [\"area 1\"], \"keyTakeaways\": \"advice\", \"nextSteps\": [\"step 1\"]}}"
    )
}

/// Asks for the end-of-interview summary. `None` when the gateway produced nothing usable.
pub async fn request_summary(
    ai: &AiGateway,
    question_type: QuestionType,
    domain: Domain,
    question_count: usize,
) -> Option<InterviewSummary> {
    let prompt = summary_prompt(question_type, domain, question_count);
    let completion = match ai.complete(&prompt, SUMMARY_MAX_TOKENS).await {
        Ok(completion) => completion,
        Err(failure) => {
            warn!(provider = failure.provider, error = %failure.message, "interview summary failed");
            return None;
        }
    };

    let Some(payload) = extract_as::<SummaryPayload>(&completion.text) else {
        warn!(provider = completion.provider, "AI summary unparseable");
        return None;
    };
    Some(InterviewSummary {
        overall_score: payload
            .overall_score
            .filter(|s| s.is_finite())
            .map(clamp_score),
        summary: payload.summary,
        strengths: payload.strengths,
        areas_for_improvement: payload.areas_for_improvement,
        key_takeaways: payload.key_takeaways,
        next_steps: payload.next_steps,
        communication: payload.communication.map(CommunicationPayload::into_skills),
    })
}

pub fn fallback_summary() -> InterviewSummary {
    InterviewSummary {
        overall_score: Some(75),
        summary: "Good performance overall.".to_string(),
        strengths: vec!["Consistent effort".to_string()],
        areas_for_improvement: vec!["More examples".to_string()],
        key_takeaways: "Continue practicing.".to_string(),
        next_steps: vec!["Review feedback".to_string(), "Practice more".to_string()],
        communication: None,
    }
}

fn clamp_score(value: f64) -> u32 {
    value.clamp(0.0, 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::services::ai::{AiProvider, ProviderError};

    struct Reply(Result<&'static str, &'static str>);

    #[async_trait]
    impl AiProvider for Reply {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
            self.0
                .map(str::to_string)
                .map_err(|m| ProviderError::Api(m.to_string()))
        }
    }

    fn gateway(reply: Result<&'static str, &'static str>) -> AiGateway {
        AiGateway::new(Arc::new(Reply(reply)), Arc::new(Reply(reply)))
    }

    #[test]
    fn question_prompt_lists_avoided_topics() {
        let prompt = question_prompt(
            QuestionType::Technical,
            Domain::DataScience,
            Difficulty::Hard,
            &["Statistics".to_string(), "SQL".to_string()],
        );
        assert!(prompt.contains("ONE hard level technical interview question for data-science"));
        assert!(prompt.contains("Avoid these topics: Statistics, SQL"));

        let bare = question_prompt(
            QuestionType::Behavioral,
            Domain::General,
            Difficulty::Medium,
            &[],
        );
        assert!(!bare.contains("Avoid these topics"));
    }

    #[tokio::test]
    async fn generated_question_accepts_either_points_field() {
        let ai = gateway(Ok(
            r#"{"question": " What is a monad? ", "category": "FP", "expectedAnswerPoints": ["bind"], "timeLimit": 120}"#,
        ));
        let generated = request_question(
            &ai,
            QuestionType::Technical,
            Domain::SoftwareEngineering,
            Difficulty::Medium,
            &[],
        )
        .await
        .unwrap();
        assert_eq!(generated.question, "What is a monad?");
        assert_eq!(generated.category.as_deref(), Some("FP"));
        assert_eq!(generated.expected_points, vec!["bind".to_string()]);
        assert_eq!(generated.time_limit, Some(120));
    }

    #[tokio::test]
    async fn empty_question_text_is_rejected() {
        let ai = gateway(Ok(r#"{"question": "", "category": "X"}"#));
        let generated = request_question(
            &ai,
            QuestionType::Technical,
            Domain::Design,
            Difficulty::Easy,
            &[],
        )
        .await;
        assert_eq!(generated, None);
    }

    #[tokio::test]
    async fn failing_gateway_yields_domain_fallback_question() {
        let ai = gateway(Err("offline"));
        let generated = generate_question(
            &ai,
            QuestionType::Behavioral,
            Domain::Marketing,
            Difficulty::Medium,
            &[],
        )
        .await;
        assert!(generated.question.contains("marketing"));
        assert_eq!(generated.time_limit, Some(300));
        assert!(generated.category.is_some());
    }

    #[test]
    fn every_fallback_template_substitutes_domain() {
        for index in 0..FALLBACK_QUESTION_COUNT {
            let generated = fallback_question_at(Domain::ProductManagement, index);
            assert!(generated.question.contains("product-management"));
            assert!(!generated.question.contains("{domain}"));
            assert!(!generated.expected_points.is_empty());
        }
    }

    #[tokio::test]
    async fn evaluation_parses_and_clamps_scores() {
        let ai = gateway(Ok(
            "```json\n{\"score\": 104.6, \"strengths\": [\"Structured\"], \"improvements\": [], \"analysis\": \"Solid\", \"communication\": {\"clarity\": 80, \"structure\": 72.4, \"confidence\": -3}}\n```",
        ));
        let evaluation = evaluate_answer(
            &ai,
            "Q",
            "A",
            QuestionType::Technical,
            Domain::SoftwareEngineering,
        )
        .await;
        assert_eq!(evaluation.score, Some(100));
        assert_eq!(evaluation.strengths, vec!["Structured".to_string()]);
        assert_eq!(
            evaluation.communication,
            Some(CommunicationSkills {
                clarity: 80,
                structure: 72,
                confidence: 0
            })
        );
    }

    #[tokio::test]
    async fn unusable_evaluation_falls_back() {
        let ai = gateway(Ok("I'd rate this answer highly."));
        let evaluation = evaluate_answer(&ai, "Q", "A", QuestionType::Behavioral, Domain::General).await;
        assert_eq!(evaluation, fallback_evaluation());

        let ai = gateway(Err("offline"));
        let evaluation = evaluate_answer(&ai, "Q", "A", QuestionType::Behavioral, Domain::General).await;
        assert_eq!(evaluation.score, Some(70));
    }

    #[tokio::test]
    async fn summary_without_score_keeps_text() {
        let ai = gateway(Ok(r#"{"summary": "Fine", "strengths": ["Calm"], "keyTakeaways": "Practice"}"#));
        let summary = request_summary(&ai, QuestionType::Behavioral, Domain::General, 3)
            .await
            .unwrap();
        assert_eq!(summary.overall_score, None);
        assert_eq!(summary.summary, "Fine");
        assert_eq!(summary.key_takeaways, "Practice");
    }
}
