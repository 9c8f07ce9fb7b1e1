#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use mock_interview_backend::auth::sign_jwt_for_user;
use mock_interview_backend::build_router;
use mock_interview_backend::config::Config;
use mock_interview_backend::db::MemoryStore;
use mock_interview_backend::services::ai::{AiGateway, AiProvider, ProviderError};
use mock_interview_backend::state::AppState;
use mock_interview_backend::workers::ProgressWorker;

pub const JWT_SECRET: &str = "integration-secret";

type Script = dyn Fn(&str) -> Result<String, String> + Send + Sync;

/// In-process provider answering each prompt through a closure and recording what it saw.
pub struct ScriptedProvider {
    name: &'static str,
    script: Box<Script>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(
        name: &'static str,
        script: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Self::new(name, |_| Err("provider offline".to_string()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        self.prompts.lock().push(prompt.to_string());
        (self.script)(prompt).map_err(ProviderError::Api)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new(primary: Arc<dyn AiProvider>, secondary: Arc<dyn AiProvider>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ai = AiGateway::new(primary, secondary);
        let progress = ProgressWorker::spawn(store.clone());
        let state = AppState::new(
            Arc::new(Config::for_tests(JWT_SECRET)),
            store.clone(),
            ai,
            progress,
        );
        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    /// Both providers down: every AI call falls back to canned content.
    pub fn offline() -> Self {
        Self::new(
            ScriptedProvider::failing("primary"),
            ScriptedProvider::failing("secondary"),
        )
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user_id: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn post(&self, uri: &str, user_id: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(user_id), Some(body)).await
    }
}

pub fn token_for(user_id: &str) -> String {
    sign_jwt_for_user(user_id, JWT_SECRET, "1h").unwrap().0
}
