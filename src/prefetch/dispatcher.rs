use super::orchestrator::PrefetchOrchestrator;
use crate::models::TrackHints;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Outcomes kept for slow subscribers before the oldest are dropped
const OUTCOME_BUFFER: usize = 64;

#[derive(Debug)]
struct PrefetchJob {
    id: Uuid,
    content_id: String,
    hints: TrackHints,
    token: Option<String>,
}

/// Telemetry for one finished prefetch job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchOutcome {
    pub job_id: Uuid,
    pub content_id: String,
    pub next_id: Option<String>,
    pub error: Option<String>,
}

/// Queue of detached prefetch jobs.
///
/// Jobs go through an unbounded channel to a worker task that runs each one
/// in its own task, so dispatching never waits on the work itself. Results
/// only ever reach the telemetry channel.
pub struct PrefetchDispatcher {
    jobs: mpsc::UnboundedSender<PrefetchJob>,
    outcomes: broadcast::Sender<PrefetchOutcome>,
}

impl PrefetchDispatcher {
    /// Spawns the worker; must be called from within a tokio runtime.
    pub fn start(orchestrator: Arc<PrefetchOrchestrator>) -> Self {
        let (jobs, job_rx) = mpsc::unbounded_channel();
        let (outcomes, _) = broadcast::channel(OUTCOME_BUFFER);

        tokio::spawn(run_worker(job_rx, orchestrator, outcomes.clone()));

        Self { jobs, outcomes }
    }

    /// Queue a prefetch for the successor of `content_id`.
    ///
    /// Returns the job id, or `None` if the worker is gone.
    pub fn dispatch(&self, content_id: &str, hints: &TrackHints, token: Option<&str>) -> Option<Uuid> {
        let job = PrefetchJob {
            id: Uuid::new_v4(),
            content_id: content_id.to_string(),
            hints: hints.clone(),
            token: token.map(str::to_string),
        };
        let id = job.id;

        match self.jobs.send(job) {
            Ok(()) => {
                log::debug!("Queued prefetch {} after '{}'", id, content_id);
                Some(id)
            }
            Err(_) => {
                log::warn!("Prefetch worker stopped, dropping job for '{}'", content_id);
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrefetchOutcome> {
        self.outcomes.subscribe()
    }
}

async fn run_worker(
    mut jobs: mpsc::UnboundedReceiver<PrefetchJob>,
    orchestrator: Arc<PrefetchOrchestrator>,
    outcomes: broadcast::Sender<PrefetchOutcome>,
) {
    while let Some(job) = jobs.recv().await {
        let orchestrator = orchestrator.clone();
        let outcomes = outcomes.clone();

        tokio::spawn(async move {
            let result = orchestrator
                .try_fetch_next(&job.content_id, &job.hints, job.token.as_deref())
                .await;

            let outcome = match result {
                Ok(payload) => PrefetchOutcome {
                    job_id: job.id,
                    content_id: job.content_id,
                    next_id: Some(payload.content_id),
                    error: None,
                },
                Err(e) => {
                    log::warn!("Prefetch {} after '{}' failed: {}", job.id, job.content_id, e);
                    PrefetchOutcome {
                        job_id: job.id,
                        content_id: job.content_id,
                        next_id: None,
                        error: Some(e.to_string()),
                    }
                }
            };

            if let Err(e) = outcomes.send(outcome) {
                log::debug!("No subscribers for prefetch outcome {}", e.0.job_id);
            }
        });
    }

    log::debug!("Prefetch queue closed");
}
