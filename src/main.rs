use std::sync::Arc;

use mock_interview_backend::build_router;
use mock_interview_backend::config::Config;
use mock_interview_backend::db::config::{DbConfig, DbConfigError};
use mock_interview_backend::db::{MemoryStore, PgStore, Store};
use mock_interview_backend::logging;
use mock_interview_backend::seed;
use mock_interview_backend::services::ai::AiGateway;
use mock_interview_backend::services::question_bank::QuestionBank;
use mock_interview_backend::state::AppState;
use mock_interview_backend::workers::ProgressWorker;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let _log_guard = logging::init_tracing(&config.log_level, &config.error_log_path);
    logging::install_panic_hook();

    let store: Arc<dyn Store> = match DbConfig::from_env() {
        Ok(db_config) => match PgStore::connect(&db_config).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::error!(error = %err, "database initialization failed");
                std::process::exit(1);
            }
        },
        Err(DbConfigError::Missing { key }) => {
            tracing::warn!(key, "database not configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let ai = AiGateway::from_config(&config.ai);
    let (primary, secondary) = ai.provider_names();
    tracing::info!(primary, secondary, "AI gateway configured");

    let progress = ProgressWorker::spawn(store.clone());

    if config.seed.enabled {
        let bank = QuestionBank::new(store.clone(), ai.clone());
        let per_combo = config.seed.per_combo;
        tokio::spawn(async move {
            seed::seed_question_bank(&bank, per_combo).await;
        });
    }

    let state = AppState::new(config.clone(), store, ai, progress.clone());
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "mock interview backend listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, draining progress updates");
    progress.shutdown().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
