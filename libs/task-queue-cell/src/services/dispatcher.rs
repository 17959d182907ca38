use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{Task, TaskEnvelope, TaskQueueError};

/// Producer side of the task queue. Handlers hold an `Arc<dyn TaskDispatcher>`.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, task: Task) -> Result<TaskEnvelope, TaskQueueError>;
}

/// Consumer side of the task queue. Popping removes the task for good.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn next_task(&self, wait: Duration) -> Result<Option<TaskEnvelope>, TaskQueueError>;
}

/// Fire-and-forget enqueue: failures are logged and reported as `false`.
pub async fn dispatch_best_effort(dispatcher: &dyn TaskDispatcher, task: Task) -> bool {
    let kind = task.kind();
    match dispatcher.dispatch(task).await {
        Ok(envelope) => {
            debug!("Queued {} task {}", kind, envelope.task_id);
            true
        }
        Err(e) => {
            warn!("Failed to queue {} task: {}", kind, e);
            false
        }
    }
}
