use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment intent fields the webhook hands over to the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentIntentUpdate {
    pub payment_intent_id: String,
    pub status: String,
}

/// Background work. Serialised as `{"type": "send_sms", ...}` on the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    SendSms {
        user_id: Uuid,
        message: String,
    },
    SendEmail {
        address: String,
        subject: String,
        body: String,
    },
    ProcessPaymentWebhook {
        event: PaymentIntentUpdate,
    },
}

impl Task {
    pub fn send_sms(user_id: Uuid, message: impl Into<String>) -> Self {
        Task::SendSms { user_id, message: message.into() }
    }

    pub fn send_email(
        address: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Task::SendEmail {
            address: address.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn process_payment_webhook(payment_intent_id: impl Into<String>, status: impl Into<String>) -> Self {
        Task::ProcessPaymentWebhook {
            event: PaymentIntentUpdate {
                payment_intent_id: payment_intent_id.into(),
                status: status.into(),
            },
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::SendSms { .. } => TaskKind::SendSms,
            Task::SendEmail { .. } => TaskKind::SendEmail,
            Task::ProcessPaymentWebhook { .. } => TaskKind::ProcessPaymentWebhook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SendSms,
    SendEmail,
    ProcessPaymentWebhook,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::SendSms => write!(f, "send_sms"),
            TaskKind::SendEmail => write!(f, "send_email"),
            TaskKind::ProcessPaymentWebhook => write!(f, "process_payment_webhook"),
        }
    }
}

/// A task as stored on the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskEnvelope {
    pub task_id: Uuid,
    pub task: Task,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskEnvelope {
    pub fn new(task: Task) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            task,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub processed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub last_task_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending_tasks: u64,
    pub enqueued_since_start: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub task_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            concurrency: 4,
            task_timeout_seconds: 60,
            poll_interval_ms: 1000,
            error_backoff_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tasks_serialize_with_type_tag() {
        let user_id = Uuid::new_v4();
        let task = Task::send_sms(user_id, "Your reservation has been approved.");

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value, json!({
            "type": "send_sms",
            "user_id": user_id,
            "message": "Your reservation has been approved."
        }));
    }

    #[test]
    fn payment_webhook_task_reads_back() {
        let raw = json!({
            "type": "process_payment_webhook",
            "event": { "payment_intent_id": "pi_123", "status": "succeeded" }
        });

        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task, Task::process_payment_webhook("pi_123", "succeeded"));
        assert_eq!(task.kind().to_string(), "process_payment_webhook");
    }
}
