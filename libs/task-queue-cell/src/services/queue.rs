use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::{QueueStats, Task, TaskDispatcher, TaskEnvelope, TaskQueueError, TaskSource};

const DEFAULT_QUEUE_PREFIX: &str = "task_queue";

/// Redis list backed queue: producers `LPUSH`, workers `BRPOP`.
pub struct RedisTaskQueue {
    pool: Pool,
    pending_key: String,
    enqueued: AtomicU64,
}

impl RedisTaskQueue {
    pub async fn new(config: &AppConfig) -> Result<Self, TaskQueueError> {
        Self::with_prefix(config, DEFAULT_QUEUE_PREFIX).await
    }

    pub async fn with_prefix(config: &AppConfig, prefix: &str) -> Result<Self, TaskQueueError> {
        let redis_url = config.redis_url.clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            TaskQueueError::QueueError(format!("Failed to create Redis pool: {}", e))
        })?;

        let queue = Self {
            pool,
            pending_key: format!("{}:pending", prefix),
            enqueued: AtomicU64::new(0),
        };

        let mut conn = queue.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis task queue initialized on key {}", queue.pending_key);

        Ok(queue)
    }

    pub async fn queue_depth(&self) -> Result<u64, TaskQueueError> {
        let mut conn = self.get_connection().await?;
        let depth: u64 = conn.llen(&self.pending_key).await?;
        Ok(depth)
    }

    pub async fn stats(&self) -> Result<QueueStats, TaskQueueError> {
        Ok(QueueStats {
            pending_tasks: self.queue_depth().await?,
            enqueued_since_start: self.enqueued.load(Ordering::Relaxed),
        })
    }

    async fn get_connection(&self) -> Result<Connection, TaskQueueError> {
        self.pool.get().await.map_err(|e| {
            TaskQueueError::QueueError(format!("Failed to get Redis connection: {}", e))
        })
    }
}

#[async_trait]
impl TaskDispatcher for RedisTaskQueue {
    async fn dispatch(&self, task: Task) -> Result<TaskEnvelope, TaskQueueError> {
        let envelope = TaskEnvelope::new(task);
        let payload = serde_json::to_string(&envelope)?;

        let mut conn = self.get_connection().await?;
        let _: () = conn.lpush(&self.pending_key, payload).await?;
        self.enqueued.fetch_add(1, Ordering::Relaxed);

        debug!("Task {} ({}) enqueued", envelope.task_id, envelope.task.kind());
        Ok(envelope)
    }
}

#[async_trait]
impl TaskSource for RedisTaskQueue {
    async fn next_task(&self, wait: Duration) -> Result<Option<TaskEnvelope>, TaskQueueError> {
        let mut conn = self.get_connection().await?;
        let timeout_secs = wait.as_secs().max(1);

        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.pending_key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        match popped {
            Some((_, payload)) => match serde_json::from_str::<TaskEnvelope>(&payload) {
                Ok(envelope) => Ok(Some(envelope)),
                Err(e) => {
                    error!("Dropping undecodable task payload: {}", e);
                    Err(e.into())
                }
            },
            None => Ok(None),
        }
    }
}
