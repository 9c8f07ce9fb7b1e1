use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::Store;
use crate::services::ai::AiGateway;
use crate::services::interview::InterviewService;
use crate::services::question_bank::QuestionBank;
use crate::workers::ProgressWorker;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    config: Arc<Config>,
    store: Arc<dyn Store>,
    interviews: InterviewService,
    questions: QuestionBank,
    progress: ProgressWorker,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        ai: AiGateway,
        progress: ProgressWorker,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            interviews: InterviewService::new(store.clone(), ai.clone(), progress.clone()),
            questions: QuestionBank::new(store.clone(), ai.clone()),
            config,
            store,
            progress,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn interviews(&self) -> &InterviewService {
        &self.interviews
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    pub fn progress_worker(&self) -> &ProgressWorker {
        &self.progress
    }
}
