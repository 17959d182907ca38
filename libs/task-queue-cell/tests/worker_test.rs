use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use uuid::Uuid;

use task_queue_cell::*;

#[derive(Default)]
struct RecordingHandler {
    handled: Mutex<Vec<Task>>,
    fail_emails: bool,
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn handle(&self, task: &Task) -> anyhow::Result<()> {
        self.handled.lock().unwrap().push(task.clone());
        if self.fail_emails && matches!(task, Task::SendEmail { .. }) {
            anyhow::bail!("smtp down");
        }
        Ok(())
    }
}

struct SlowHandler;

#[async_trait]
impl TaskHandler for SlowHandler {
    async fn handle(&self, _task: &Task) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

fn test_config() -> WorkerConfig {
    WorkerConfig {
        worker_id: "test-worker".to_string(),
        concurrency: 2,
        task_timeout_seconds: 1,
        poll_interval_ms: 10,
        error_backoff_ms: 10,
    }
}

#[tokio::test]
async fn test_worker_drains_queue_and_stops_on_shutdown() {
    let queue = Arc::new(InMemoryTaskQueue::new());
    let handler = Arc::new(RecordingHandler::default());

    let patient_id = Uuid::new_v4();
    queue.dispatch(Task::send_sms(patient_id, "Your reservation has been approved.")).await.unwrap();
    queue.dispatch(Task::send_email("p@example.com", "Reservation Approved", "Your reservation has been approved.")).await.unwrap();
    queue.dispatch(Task::process_payment_webhook("pi_123", "succeeded")).await.unwrap();

    let worker = TaskWorker::new(test_config(), queue.clone(), handler.clone());
    let running = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    for _ in 0..100 {
        if handler.handled.lock().unwrap().len() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    worker.shutdown().await;
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("worker should stop after shutdown")
        .unwrap();

    assert_eq!(handler.handled.lock().unwrap().len(), 3);
    assert_eq!(queue.pending_len(), 0);
    assert_eq!(worker.stats().await.processed, 3);
}

#[tokio::test]
async fn test_failed_task_is_not_requeued() {
    let queue = Arc::new(InMemoryTaskQueue::new());
    let handler = Arc::new(RecordingHandler { fail_emails: true, ..Default::default() });
    let worker = TaskWorker::new(test_config(), queue.clone(), handler.clone());

    let envelope = queue.dispatch(Task::send_email("p@example.com", "s", "b")).await.unwrap();
    let popped = queue.next_task(Duration::from_millis(10)).await.unwrap().unwrap();
    assert_eq!(popped.task_id, envelope.task_id);

    let outcome = worker.process(popped).await;

    assert_matches!(outcome, TaskOutcome::Failed(reason) if reason == "smtp down");
    assert_eq!(queue.pending_len(), 0);
    assert_eq!(worker.stats().await.failed, 1);
}

#[tokio::test]
async fn test_slow_task_times_out() {
    let queue = Arc::new(InMemoryTaskQueue::new());
    let worker = TaskWorker::new(test_config(), queue.clone(), Arc::new(SlowHandler));

    let outcome = worker.process(TaskEnvelope::new(Task::send_sms(Uuid::new_v4(), "hi"))).await;

    assert_eq!(outcome, TaskOutcome::TimedOut);
    assert_eq!(worker.stats().await.timed_out, 1);
}

#[tokio::test]
async fn test_dispatch_best_effort_swallows_queue_failure() {
    let queue = InMemoryTaskQueue::new();
    queue.set_unavailable(true);

    let queued = dispatch_best_effort(&queue, Task::send_sms(Uuid::new_v4(), "hi")).await;

    assert!(!queued);
    assert!(queue.dispatched().is_empty());
}
