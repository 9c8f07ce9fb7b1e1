use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use mock_interview_backend::services::question_bank::QuestionQuery;
use mock_interview_backend::models::{Difficulty, Domain, QuestionType};

mod common;

use common::{ScriptedProvider, TestApp};

/// Question prompts get a fresh category per call; everything else fails.
fn generating_app() -> TestApp {
    let provider = ScriptedProvider::new("scripted", |prompt| {
        if prompt.starts_with("Generate exactly ONE") {
            let topic = if prompt.contains("Avoid these topics") { "Graphs" } else { "Arrays" };
            Ok(format!(
                r#"Sure! {{"question": "Explain {topic} in depth.", "category": "{topic}", "expectedPoints": ["definition"], "timeLimit": 240}}"#
            ))
        } else {
            Err("unavailable".to_string())
        }
    });
    TestApp::new(provider, ScriptedProvider::failing("secondary"))
}

#[tokio::test]
async fn question_bank_endpoints_filter_and_lookup() {
    let app = generating_app();
    let bank = app.state.questions();
    bank.get_questions(
        &QuestionQuery::new(QuestionType::Technical, Domain::SoftwareEngineering, Difficulty::Medium),
        1,
    )
    .await
    .unwrap();
    bank.get_questions(
        &QuestionQuery::new(QuestionType::Behavioral, Domain::Design, Difficulty::Medium),
        1,
    )
    .await
    .unwrap();

    let (status, body) = app.get("/api/questions?type=technical", "u1").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["domain"], "software-engineering");
    assert_eq!(listed[0]["timeLimit"], 240);
    assert_eq!(
        listed[0]["tags"],
        json!(["technical", "software-engineering", "Arrays"])
    );
    assert_eq!(listed[0]["aiPrompt"], "Question about software-engineering");

    let id = listed[0]["id"].as_str().unwrap();
    let (status, body) = app.get(&format!("/api/questions/{id}"), "u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"], "Explain Arrays in depth.");

    let (status, body) = app.get("/api/questions/unknown", "u1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Question not found");

    let (_, body) = app.get("/api/questions/categories", "u1").await;
    assert_eq!(body["data"], json!(["Arrays"]));

    let (status, _) = app.get("/api/questions?domain=cooking", "u1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn next_question_generation_avoids_asked_categories() {
    let app = generating_app();
    let (status, body) = app
        .post(
            "/api/interviews/start",
            "u1",
            json!({"type": "technical", "mode": "text", "domain": "data-science", "numQuestions": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["questions"][0]["category"], "Arrays");
    let id = body["data"]["interviewId"].as_str().unwrap();

    let (status, body) = app
        .get(&format!("/api/interviews/{id}/next-question"), "u1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"], "Graphs");
}

#[tokio::test]
async fn feedback_and_stats_follow_completed_interviews() {
    let app = TestApp::offline();
    let mut events = app.state.progress_worker().subscribe();

    let (status, body) = app.get("/api/feedback/interview/none", "u1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Feedback not found");

    let mut ids = Vec::new();
    for (kind, domain) in [("technical", "general"), ("behavioral", "general")] {
        let (_, body) = app
            .post(
                "/api/interviews/start",
                "u1",
                json!({"type": kind, "mode": "audio", "domain": domain, "numQuestions": 1}),
            )
            .await;
        let id = body["data"]["interviewId"].as_str().unwrap().to_string();
        let (status, _) = app
            .post(&format!("/api/interviews/{id}/complete"), "u1", json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("progress event")
            .unwrap();
        ids.push(id);
    }

    let (status, body) = app.get("/api/feedback", "u1").await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["interviewId"], ids[1].as_str());
    assert_eq!(items[0]["interview"]["type"], "behavioral");
    assert_eq!(items[0]["overallFeedback"]["score"], 75);

    let (_, other) = app.get("/api/feedback", "u2").await;
    assert!(other["data"].as_array().unwrap().is_empty());

    let (status, body) = app.get("/api/progress/stats", "u1").await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["totalInterviews"], 2);
    assert_eq!(stats["byType"]["technical"]["count"], 1);
    assert_eq!(stats["byDomain"]["general"]["count"], 2);
    assert_eq!(stats["byDomain"]["general"]["avgScore"], 75);
    assert_eq!(stats["scoreTrend"].as_array().unwrap().len(), 2);
    assert_eq!(stats["recentScores"][1]["type"], "behavioral");
}

#[tokio::test]
async fn progress_is_empty_for_new_users() {
    let app = TestApp::offline();
    let (status, body) = app.get("/api/progress", "fresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalInterviews"], 0);
    assert_eq!(body["data"]["averageScore"], 0);
}
