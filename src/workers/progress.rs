use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::db::Store;
use crate::models::Interview;
use crate::services::progress;

const EVENT_CAPACITY: usize = 256;

/// Outcome of one background progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressEvent {
    Recorded {
        user_id: String,
        interview_id: String,
    },
    Failed {
        user_id: String,
        interview_id: String,
        error: String,
    },
}

impl ProgressEvent {
    pub fn interview_id(&self) -> &str {
        match self {
            ProgressEvent::Recorded { interview_id, .. } => interview_id,
            ProgressEvent::Failed { interview_id, .. } => interview_id,
        }
    }
}

struct ProgressJob {
    user_id: String,
    interview: Interview,
}

/// Applies completed interviews to user progress off the request path.
///
/// Jobs are processed one at a time in enqueue order, so two completions for the same user
/// never interleave their read and update steps inside one process.
#[derive(Clone)]
pub struct ProgressWorker {
    queue: Arc<Mutex<Option<mpsc::UnboundedSender<ProgressJob>>>>,
    events: broadcast::Sender<ProgressEvent>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ProgressWorker {
    pub fn spawn(store: Arc<dyn Store>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let handle = tokio::spawn(run(store, rx, events.clone()));

        Self {
            queue: Arc::new(Mutex::new(Some(tx))),
            events,
            handle: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Queues a progress update. Never blocks; after shutdown the job is logged and dropped.
    pub fn enqueue(&self, user_id: &str, interview: Interview) {
        let guard = self.queue.lock();
        let Some(tx) = guard.as_ref() else {
            warn!(user_id, interview_id = %interview.id, "progress worker stopped, update dropped");
            return;
        };
        let job = ProgressJob {
            user_id: user_id.to_string(),
            interview,
        };
        if let Err(err) = tx.send(job) {
            warn!(user_id, interview_id = %err.0.interview.id, "progress queue closed, update dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Closes the queue and waits until every job already queued has been processed.
    pub async fn shutdown(&self) {
        drop(self.queue.lock().take());
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "progress worker task failed");
            }
        }
    }
}

async fn run(
    store: Arc<dyn Store>,
    mut rx: mpsc::UnboundedReceiver<ProgressJob>,
    events: broadcast::Sender<ProgressEvent>,
) {
    info!("progress worker started");
    while let Some(job) = rx.recv().await {
        let interview_id = job.interview.id.clone();
        let event = match progress::record_completion(store.as_ref(), &job.user_id, &job.interview)
            .await
        {
            Ok(()) => ProgressEvent::Recorded {
                user_id: job.user_id,
                interview_id,
            },
            Err(err) => {
                warn!(
                    user_id = %job.user_id,
                    interview_id = %interview_id,
                    error = %err,
                    "progress update failed"
                );
                ProgressEvent::Failed {
                    user_id: job.user_id,
                    interview_id,
                    error: err.to_string(),
                }
            }
        };
        // no subscribers is fine
        let _ = events.send(event);
    }
    info!("progress worker drained");
}
