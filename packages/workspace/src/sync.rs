//! # Sync Queue
//!
//! Serialized pipeline of persistence jobs.
//!
//! - Jobs run in the order they were enqueued, one at a time
//! - Enqueueing starts a drain only when nothing is running
//! - Status is `Syncing` while a job runs and `Idle` after it finishes,
//!   whether it succeeded, failed or panicked
//! - A failed job is logged and dropped; the queue moves on

use crate::errors::SyncError;
use crate::persistence::Persistence;
use crate::project_store::SyncBatch;
use crate::timer::{TimerHandle, TimerService};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use studio_bus::SyncStatus;
use studio_editor::PatchLog;
use tokio::sync::watch;

pub type SyncJob = BoxFuture<'static, Result<(), SyncError>>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<SyncJob>,
    running: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    status: watch::Sender<SyncStatus>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct SyncQueue {
    shared: Arc<Shared>,
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncQueue {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                status,
            }),
        }
    }

    /// Append a job; starts draining if the queue was idle
    pub fn enqueue<F>(&self, job: F)
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        let start = {
            let mut state = self.shared.state();
            state.jobs.push_back(Box::pin(job));
            !std::mem::replace(&mut state.running, true)
        };

        if start {
            tokio::spawn(drain(self.shared.clone()));
        }
    }

    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    /// Jobs waiting to run, not counting the one running
    pub fn len(&self) -> usize {
        self.shared.state().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().running
    }

    /// Resolve once every enqueued job has finished
    pub async fn wait_idle(&self) {
        let mut status = self.status();
        while self.is_running() {
            if status.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Status updates are sent under the state lock so a drain that is
/// finishing cannot overwrite `Syncing` from the next one.
async fn drain(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.state();
            let Some(job) = state.jobs.pop_front() else {
                state.running = false;
                return;
            };
            shared.status.send_replace(SyncStatus::Syncing);
            job
        };

        // Spawned so a panicking job is caught as a JoinError
        let result = match tokio::spawn(job).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Panicked),
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Sync job failed");
        }

        let done = {
            let mut state = shared.state();
            shared.status.send_replace(SyncStatus::Idle);
            if state.jobs.is_empty() {
                state.running = false;
            }
            !state.running
        };
        if done {
            return;
        }
    }
}

/// Periodically move pending patches from `log` into sync jobs
pub fn spawn_harvester(
    timers: &TimerService,
    interval: Duration,
    log: PatchLog,
    queue: SyncQueue,
    persistence: Arc<dyn Persistence>,
    project_id: String,
    tree_id: String,
) -> TimerHandle {
    timers.every(interval, move || {
        harvest(&log, &queue, &persistence, &project_id, &tree_id);
        async {}
    })
}

/// Enqueue one job for everything pending in `log`.
/// Returns false when there was nothing to send.
pub fn harvest(
    log: &PatchLog,
    queue: &SyncQueue,
    persistence: &Arc<dyn Persistence>,
    project_id: &str,
    tree_id: &str,
) -> bool {
    let transactions = log.drain();
    if transactions.is_empty() {
        return false;
    }

    let batch = SyncBatch::new(project_id, tree_id, transactions);
    tracing::debug!(
        batch_id = %batch.batch_id,
        transactions = batch.transactions.len(),
        "Harvested patches"
    );
    queue.enqueue(persistence.persist(batch));
    true
}
