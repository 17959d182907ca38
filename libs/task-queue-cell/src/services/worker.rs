use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::{Task, TaskEnvelope, TaskOutcome, TaskSource, WorkerConfig, WorkerStats};

/// Executes one task. Errors are logged by the worker and never retried.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct TaskWorker {
    config: WorkerConfig,
    source: Arc<dyn TaskSource>,
    handler: Arc<dyn TaskHandler>,
    is_shutdown: Arc<RwLock<bool>>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl TaskWorker {
    pub fn new(
        config: WorkerConfig,
        source: Arc<dyn TaskSource>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        Self {
            config,
            source,
            handler,
            is_shutdown: Arc::new(RwLock::new(false)),
            stats: Arc::new(RwLock::new(WorkerStats::default())),
        }
    }

    /// Run `concurrency` consumer loops until `shutdown` is called.
    pub async fn run(&self) {
        info!(
            "Starting task worker {} with {} consumers",
            self.config.worker_id, self.config.concurrency
        );

        let handles: Vec<_> = (0..self.config.concurrency.max(1))
            .map(|i| {
                let worker = self.clone();
                let name = format!("{}-{}", self.config.worker_id, i);
                tokio::spawn(async move { worker.worker_loop(name).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Consumer loop panicked: {}", e);
            }
        }

        info!("Task worker {} stopped", self.config.worker_id);
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown for worker {}", self.config.worker_id);
        *self.is_shutdown.write().await = true;
    }

    pub async fn stats(&self) -> WorkerStats {
        self.stats.read().await.clone()
    }

    async fn worker_loop(&self, name: String) {
        debug!("Consumer loop started: {}", name);
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if *self.is_shutdown.read().await {
                debug!("Consumer {} received shutdown signal", name);
                break;
            }

            match self.source.next_task(poll).await {
                Ok(Some(envelope)) => {
                    self.process(envelope).await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Consumer {} failed to fetch task: {}", name, e);
                    tokio::time::sleep(Duration::from_millis(self.config.error_backoff_ms)).await;
                }
            }
        }

        debug!("Consumer loop ended: {}", name);
    }

    /// Execute a single task under the configured timeout.
    #[instrument(skip(self, envelope), fields(task_id = %envelope.task_id, kind = %envelope.task.kind()))]
    pub async fn process(&self, envelope: TaskEnvelope) -> TaskOutcome {
        let started = Instant::now();
        let limit = Duration::from_secs(self.config.task_timeout_seconds);

        let outcome = match timeout(limit, self.handler.handle(&envelope.task)).await {
            Ok(Ok(())) => TaskOutcome::Completed,
            Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
            Err(_) => TaskOutcome::TimedOut,
        };

        {
            let mut stats = self.stats.write().await;
            stats.last_task_at = Some(Utc::now());
            match &outcome {
                TaskOutcome::Completed => stats.processed += 1,
                TaskOutcome::Failed(_) => stats.failed += 1,
                TaskOutcome::TimedOut => stats.timed_out += 1,
            }
        }

        match &outcome {
            TaskOutcome::Completed => {
                debug!("Task completed in {} ms", started.elapsed().as_millis());
            }
            TaskOutcome::Failed(reason) => {
                warn!("Task failed and will not be retried: {}", reason);
            }
            TaskOutcome::TimedOut => {
                warn!("Task timed out after {} seconds", self.config.task_timeout_seconds);
            }
        }

        outcome
    }
}
