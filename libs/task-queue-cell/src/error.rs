use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskQueueError {
    #[error("Queue operation failed: {0}")]
    QueueError(String),

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Task timed out after {timeout_seconds} seconds")]
    TaskTimeout { timeout_seconds: u64 },

    #[error("Task queue is not configured")]
    NotConfigured,
}
