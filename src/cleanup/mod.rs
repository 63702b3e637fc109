//! Deferred cleanup of staged artifacts
//!
//! Every staged reel leaves two directories behind: the fetcher's working
//! directory and the public directory served under `/static`. The
//! [`CleanupScheduler`] deletes both after a fixed delay.
//!
//! # Model
//!
//! - [`CleanupScheduler::schedule`] assigns a [`CleanupTaskId`], records the task
//!   as [`CleanupState::Scheduled`] and enqueues it. It never waits.
//! - A fixed number of workers pull tasks from a single FIFO queue. Because the
//!   delay is the same for every task, FIFO order is also due-time order.
//! - A worker sleeps until the task is due, removes the public directory, then
//!   the working directory, and marks the task done. Missing directories are
//!   not an error; any other failure is logged and the task still completes.
//!
//! Tasks live in memory only. Shutting down drops whatever is still pending.

mod worker;

use crate::config::{CleanupConfig, MAX_CLEANUP_DELAY};
use crate::types::{CleanupState, CleanupTaskId, Event, Shortcode};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A pending deletion of one shortcode's directories
#[derive(Debug)]
pub(crate) struct CleanupTask {
    pub id: CleanupTaskId,
    pub shortcode: Shortcode,
    pub public_dir: PathBuf,
    pub working_dir: PathBuf,
    pub due: Instant,
}

/// Handle returned by [`CleanupScheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCleanup {
    /// Id for [`CleanupScheduler::status`]
    pub id: CleanupTaskId,
    /// Wall-clock time the deletion becomes due
    pub due_at: chrono::DateTime<chrono::Utc>,
}

/// Live task states; finished tasks are removed
pub(crate) type TaskStates = Arc<Mutex<HashMap<CleanupTaskId, CleanupState>>>;

/// Schedules and runs deferred deletions on a bounded worker pool
pub struct CleanupScheduler {
    delay: Duration,
    wall_delay: chrono::Duration,
    queue_tx: mpsc::UnboundedSender<CleanupTask>,
    states: TaskStates,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CleanupScheduler {
    /// Start `config.workers` workers (at least one) deleting after `config.delay`
    ///
    /// Delays above [`MAX_CLEANUP_DELAY`] are clamped to it.
    /// Must be called from within a tokio runtime.
    pub fn new(config: &CleanupConfig, event_tx: broadcast::Sender<Event>) -> Self {
        let delay = config.delay.min(MAX_CLEANUP_DELAY);
        if delay < config.delay {
            warn!(
                requested_secs = config.delay.as_secs(),
                delay_secs = delay.as_secs(),
                "cleanup delay clamped"
            );
        }
        // The clamp keeps the delay well inside chrono's range
        let wall_delay =
            chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(1));

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let states: TaskStates = Arc::new(Mutex::new(HashMap::new()));
        let cancel_token = CancellationToken::new();
        let worker_count = config.workers.max(1);

        let workers = (0..worker_count)
            .map(|index| {
                worker::spawn_worker(worker::WorkerContext {
                    index,
                    queue_rx: queue_rx.clone(),
                    states: states.clone(),
                    event_tx: event_tx.clone(),
                    cancel_token: cancel_token.clone(),
                })
            })
            .collect();

        info!(
            workers = worker_count,
            delay_secs = delay.as_secs(),
            "cleanup scheduler started"
        );

        Self {
            delay,
            wall_delay,
            queue_tx,
            states,
            next_id: AtomicU64::new(1),
            event_tx,
            cancel_token,
            workers: Mutex::new(workers),
        }
    }

    /// Delay between scheduling and deletion
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule deletion of both directories once the delay has elapsed
    ///
    /// Returns immediately with the task id and the time it becomes due.
    /// Scheduling the same shortcode twice creates two independent tasks; the
    /// second one finds nothing left to delete. After
    /// [`shutdown`](Self::shutdown) the task is dropped with a warning.
    pub fn schedule(
        &self,
        public_dir: PathBuf,
        working_dir: PathBuf,
        shortcode: Shortcode,
    ) -> ScheduledCleanup {
        let id = CleanupTaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Instant::now();
        // Only an instant near the end of the clock's range can overflow; delete
        // right away rather than never
        let due = now.checked_add(self.delay).unwrap_or(now);
        let due_at = chrono::Utc::now() + self.wall_delay;
        let scheduled = ScheduledCleanup { id, due_at };

        self.lock_states().insert(id, CleanupState::Scheduled);

        let task = CleanupTask {
            id,
            shortcode: shortcode.clone(),
            public_dir,
            working_dir,
            due,
        };

        if self.cancel_token.is_cancelled() || self.queue_tx.send(task).is_err() {
            self.lock_states().remove(&id);
            warn!(task_id = %id, shortcode = %shortcode, "cleanup scheduler stopped, task dropped");
            return scheduled;
        }

        debug!(task_id = %id, shortcode = %shortcode, %due_at, "cleanup scheduled");
        self.event_tx
            .send(Event::CleanupScheduled {
                id,
                shortcode,
                due_at,
            })
            .ok();

        scheduled
    }

    /// Current state of a task
    ///
    /// Returns `None` for ids this scheduler never issued. Finished (and
    /// dropped) tasks report [`CleanupState::Done`].
    pub fn status(&self, id: CleanupTaskId) -> Option<CleanupState> {
        if let Some(state) = self.lock_states().get(&id) {
            return Some(*state);
        }
        let issued = id.0 >= 1 && id.0 < self.next_id.load(Ordering::Relaxed);
        issued.then_some(CleanupState::Done)
    }

    /// Number of tasks not yet done
    pub fn pending(&self) -> usize {
        self.lock_states().len()
    }

    /// Stop all workers and wait for them to exit
    ///
    /// Workers sleeping on a task abandon it; a worker in the middle of a
    /// deletion finishes it first. Pending tasks are discarded.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();

        let handles: Vec<_> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "cleanup worker ended abnormally");
            }
        }

        let dropped = {
            let mut states = self.lock_states();
            let dropped = states.len();
            states.clear();
            dropped
        };
        info!(dropped, "cleanup scheduler stopped");
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<CleanupTaskId, CleanupState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
