//! Cleanup worker loop and tolerant directory removal

use super::{CleanupTask, TaskStates};
use crate::error::CleanupError;
use crate::types::{CleanupState, Event};
use std::path::Path;
use std::sync::{Arc, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one worker needs
pub(super) struct WorkerContext {
    pub index: usize,
    pub queue_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<CleanupTask>>>,
    pub states: TaskStates,
    pub event_tx: broadcast::Sender<Event>,
    pub cancel_token: CancellationToken,
}

/// Spawn a worker that handles tasks until cancelled or the queue closes
pub(super) fn spawn_worker(ctx: WorkerContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(worker = ctx.index, "cleanup worker started");

        loop {
            let next = tokio::select! {
                _ = ctx.cancel_token.cancelled() => break,
                task = async { ctx.queue_rx.lock().await.recv().await } => task,
            };
            let Some(task) = next else {
                break;
            };

            set_state(&ctx.states, &task, CleanupState::Sleeping);

            tokio::select! {
                _ = ctx.cancel_token.cancelled() => {
                    debug!(task_id = %task.id, "shutdown while waiting, task abandoned");
                    break;
                }
                _ = tokio::time::sleep_until(task.due) => {}
            }

            run_task(&ctx, &task).await;
        }

        debug!(worker = ctx.index, "cleanup worker stopped");
    })
}

async fn run_task(ctx: &WorkerContext, task: &CleanupTask) {
    set_state(&ctx.states, task, CleanupState::Deleting);
    ctx.event_tx.send(Event::CleanupStarted { id: task.id }).ok();

    let mut removed = 0;
    for dir in [&task.public_dir, &task.working_dir] {
        match remove_dir_if_present(dir).await {
            Ok(true) => removed += 1,
            Ok(false) => debug!(task_id = %task.id, ?dir, "already gone"),
            Err(e) => warn!(
                task_id = %task.id,
                shortcode = %task.shortcode,
                kind = ?e.kind(),
                error = %e,
                "cleanup failed"
            ),
        }
    }

    ctx.states
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&task.id);

    info!(task_id = %task.id, shortcode = %task.shortcode, removed, "cleanup completed");
    ctx.event_tx
        .send(Event::CleanupCompleted {
            id: task.id,
            removed,
        })
        .ok();
}

fn set_state(states: &TaskStates, task: &CleanupTask, state: CleanupState) {
    states
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(task.id, state);
}

/// Recursively remove `dir`
///
/// Returns `Ok(false)` when the directory did not exist.
pub(super) async fn remove_dir_if_present(dir: &Path) -> Result<bool, CleanupError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CleanupError::RemoveFailed {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
