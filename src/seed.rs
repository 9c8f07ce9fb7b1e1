use tracing::{info, warn};

use crate::models::{Difficulty, Domain, QuestionType};
use crate::services::question_bank::{QuestionBank, QuestionQuery};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub combinations: usize,
    pub questions: usize,
    pub failures: usize,
}

/// Makes sure every (type, domain) pair has `per_combo` medium questions in the bank,
/// generating whatever is missing.
pub async fn seed_question_bank(bank: &QuestionBank, per_combo: usize) -> SeedReport {
    let mut report = SeedReport::default();

    for domain in Domain::ALL {
        for question_type in QuestionType::ALL {
            report.combinations += 1;
            let query = QuestionQuery::new(*question_type, *domain, Difficulty::Medium);
            match bank.get_questions(&query, per_combo).await {
                Ok(questions) => {
                    report.questions += questions.len();
                    info!(
                        %question_type,
                        %domain,
                        count = questions.len(),
                        "question bank combination ready"
                    );
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(%question_type, %domain, error = %err, "seeding combination failed");
                }
            }
        }
    }

    info!(
        combinations = report.combinations,
        questions = report.questions,
        failures = report.failures,
        "question bank seeding finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::ai::{AiGateway, AiProvider, ProviderError};

    struct Offline;

    #[async_trait]
    impl AiProvider for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured("OFFLINE"))
        }
    }

    #[tokio::test]
    async fn every_combination_is_filled_once() {
        let store = Arc::new(MemoryStore::new());
        let ai = AiGateway::new(Arc::new(Offline), Arc::new(Offline));
        let bank = QuestionBank::new(store.clone(), ai);

        let first = seed_question_bank(&bank, 2).await;
        assert_eq!(first.combinations, 18);
        assert_eq!(first.questions, 36);
        assert_eq!(first.failures, 0);
        assert_eq!(store.question_count(), 36);

        seed_question_bank(&bank, 2).await;
        assert_eq!(store.question_count(), 36);
    }
}
