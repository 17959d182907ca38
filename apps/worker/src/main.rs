use std::sync::Arc;

use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handler;

use shared_config::AppConfig;
use task_queue_cell::{RedisTaskQueue, TaskWorker, WorkerConfig};

use crate::handler::ClinicTaskHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let queue = Arc::new(RedisTaskQueue::new(&config).await?);
    let handler = Arc::new(ClinicTaskHandler::new(&config)?);

    let worker = TaskWorker::new(
        WorkerConfig {
            concurrency: config.worker_concurrency,
            ..WorkerConfig::default()
        },
        queue,
        handler,
    );

    let runner = worker.clone();
    let running = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining consumers");
    worker.shutdown().await;
    running.await?;

    Ok(())
}
