use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{Task, TaskDispatcher, TaskEnvelope, TaskQueueError, TaskSource};

/// Process-local queue used by tests and single-process development runs.
#[derive(Default)]
pub struct InMemoryTaskQueue {
    pending: Mutex<VecDeque<TaskEnvelope>>,
    history: Mutex<Vec<Task>>,
    available: Notify,
    unavailable: AtomicBool,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent dispatch fail, as if the broker were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every task ever dispatched, in order, including ones already consumed.
    pub fn dispatched(&self) -> Vec<Task> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn pop(&self) -> Option<TaskEnvelope> {
        self.pending.lock().ok().and_then(|mut p| p.pop_front())
    }
}

#[async_trait]
impl TaskDispatcher for InMemoryTaskQueue {
    async fn dispatch(&self, task: Task) -> Result<TaskEnvelope, TaskQueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaskQueueError::QueueError("queue unavailable".to_string()));
        }

        let envelope = TaskEnvelope::new(task.clone());
        {
            let mut pending = self.pending.lock()
                .map_err(|_| TaskQueueError::QueueError("queue lock poisoned".to_string()))?;
            pending.push_back(envelope.clone());
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(task);
        }
        self.available.notify_one();
        Ok(envelope)
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskQueue {
    async fn next_task(&self, wait: Duration) -> Result<Option<TaskEnvelope>, TaskQueueError> {
        if let Some(envelope) = self.pop() {
            return Ok(Some(envelope));
        }
        let _ = tokio::time::timeout(wait, self.available.notified()).await;
        Ok(self.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn pops_in_fifo_order_and_keeps_history() {
        let queue = InMemoryTaskQueue::new();
        let first = Task::send_sms(Uuid::new_v4(), "first");
        let second = Task::send_email("a@example.com", "s", "b");

        queue.dispatch(first.clone()).await.unwrap();
        queue.dispatch(second.clone()).await.unwrap();

        let popped = queue.next_task(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(popped.task, first);
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.dispatched(), vec![first, second]);
    }

    #[tokio::test]
    async fn empty_queue_returns_none_after_wait() {
        let queue = InMemoryTaskQueue::new();
        let popped = queue.next_task(Duration::from_millis(5)).await.unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn unavailable_queue_rejects_dispatch() {
        let queue = InMemoryTaskQueue::new();
        queue.set_unavailable(true);

        let result = queue.dispatch(Task::send_sms(Uuid::new_v4(), "x")).await;
        assert!(result.is_err());
        assert!(queue.dispatched().is_empty());
    }
}
