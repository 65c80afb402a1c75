use chrono::Utc;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::application::services::ArticleGenerationService;
use crate::domain::entities::GenerationRequest;
use crate::domain::errors::DomainError;
use crate::domain::repositories::{RequestRepository, StatusChange};
use crate::domain::value_objects::RequestStatus;
use crate::infrastructure::config::WorkerConfig;

pub const TIMED_OUT_ERROR: &str = "processing timed out";

/// Counts for one pass over the queue.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub timed_out: usize,
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Candidates someone else claimed, edited or deleted first, plus outcome
    /// writes that lost their claim.
    pub skipped: usize,
}

enum Outcome {
    Completed,
    Failed,
    Lost,
    NotClaimed,
}

/// Periodic queue drainer.
///
/// Each tick claims queued requests with a conditional write, so any number of
/// workers can share one store. Generation failures are recorded on the
/// request and never escape a tick.
pub struct BackgroundWorker {
    repository: Arc<dyn RequestRepository>,
    generator: Arc<ArticleGenerationService>,
    config: WorkerConfig,
    ticking: AtomicBool,
}

struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BackgroundWorker {
    pub fn new(
        repository: Arc<dyn RequestRepository>,
        generator: Arc<ArticleGenerationService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repository,
            generator,
            config,
            ticking: AtomicBool::new(false),
        }
    }

    /// Fixed-delay loop: the next tick starts one interval after the previous
    /// one finished. Returns once `shutdown` flips to `true` or its sender is
    /// dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.run_interval.as_secs(),
            batch_size = self.config.batch_size,
            concurrency = self.config.concurrency,
            "Starting background worker"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.run_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Background worker stopped");
    }

    /// One pass: fail stuck requests, claim a batch, generate. Returns `None`
    /// if a tick is already running on this worker.
    pub async fn tick(&self) -> Option<TickReport> {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Previous tick still running; skipping");
            return None;
        }
        let _guard = TickGuard(&self.ticking);

        let mut report = TickReport {
            timed_out: self.sweep_stale().await,
            ..TickReport::default()
        };

        let candidates = match self
            .repository
            .find_by_status(RequestStatus::Queued, self.config.batch_size)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Failed to load queued requests");
                return Some(report);
            }
        };

        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|request| self.claim_and_process(request))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Completed => report.completed += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Lost | Outcome::NotClaimed => report.skipped += 1,
            }
            if !matches!(outcome, Outcome::NotClaimed) {
                report.claimed += 1;
            }
        }

        if report != TickReport::default() {
            info!(
                timed_out = report.timed_out,
                claimed = report.claimed,
                completed = report.completed,
                failed = report.failed,
                skipped = report.skipped,
                "Worker tick finished"
            );
        }
        Some(report)
    }

    async fn sweep_stale(&self) -> usize {
        let Some(timeout) = self.config.processing_timeout else {
            return 0;
        };
        let Ok(timeout) = chrono::Duration::from_std(timeout) else {
            return 0;
        };

        let stale = match self.repository.find_stale_processing(Utc::now() - timeout).await {
            Ok(stale) => stale,
            Err(e) => {
                error!(error = %e, "Failed to look up stuck requests");
                return 0;
            }
        };

        let mut swept = 0;
        for request in stale {
            let change = StatusChange::Fail {
                claimed_at: request.claimed_at(),
                error: TIMED_OUT_ERROR.to_string(),
                at: Utc::now(),
            };
            match self.repository.transition(request.id(), &change).await {
                Ok(true) => {
                    warn!(request_id = %request.id(), "Request exceeded processing timeout");
                    swept += 1;
                }
                Ok(false) => {}
                Err(e) => error!(request_id = %request.id(), error = %e, "Failed to time out request"),
            }
        }
        swept
    }

    /// Claims right before processing, so `claimed_at` never counts time
    /// spent waiting for a concurrency slot.
    async fn claim_and_process(&self, request: GenerationRequest) -> Outcome {
        match self.claim(request).await {
            Some(claimed) => self.process(claimed).await,
            None => Outcome::NotClaimed,
        }
    }

    /// Returns the request as this worker now owns it, or `None` if someone
    /// else claimed, edited or deleted it first.
    async fn claim(&self, mut request: GenerationRequest) -> Option<GenerationRequest> {
        let claim = StatusChange::claim_now();
        match self.repository.transition(request.id(), &claim).await {
            Ok(true) => {
                claim.apply_to(&mut request);
                Some(request)
            }
            Ok(false) => {
                debug!(request_id = %request.id(), "Request no longer claimable");
                None
            }
            Err(e) => {
                error!(request_id = %request.id(), error = %e, "Failed to claim request");
                None
            }
        }
    }

    async fn process(&self, request: GenerationRequest) -> Outcome {
        let id = request.id();
        let started = std::time::Instant::now();

        let generated = AssertUnwindSafe(self.generator.generate(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DomainError::Generation(panic_message(panic))));

        let (change, outcome) = match generated {
            Ok(article) => (
                StatusChange::Complete {
                    claimed_at: request.claimed_at(),
                    result: article,
                    at: Utc::now(),
                },
                Outcome::Completed,
            ),
            Err(e) => {
                warn!(request_id = %id, error = %e, "Article generation failed");
                (
                    StatusChange::Fail {
                        claimed_at: request.claimed_at(),
                        error: e.to_string(),
                        at: Utc::now(),
                    },
                    Outcome::Failed,
                )
            }
        };

        match self.repository.transition(id, &change).await {
            Ok(true) => {
                debug!(
                    request_id = %id,
                    status = %change.target(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recorded outcome"
                );
                outcome
            }
            Ok(false) => {
                warn!(request_id = %id, "Claim lost before outcome was written; dropping result");
                Outcome::Lost
            }
            Err(e) => {
                error!(request_id = %id, error = %e, "Failed to record outcome");
                Outcome::Lost
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("generation panicked: {}", detail)
}
