//! Feedhub HTTP API：遥测写入口、缓冲统计与数据读取。

mod handlers;
mod middleware;
mod routes;
mod state;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use feedhub_config::{AppConfig, BufferSettings};
use feedhub_pipeline::{BatchCommitter, BufferConfig, FlushScheduler, OverflowPolicy, WriteBuffer};
use feedhub_storage::{ChannelStore, FeedStore, InMemoryFeedStore, PgFeedStore};
use feedhub_telemetry::init_tracing;

pub(crate) use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let (channels, feeds): (Arc<dyn ChannelStore>, Arc<dyn FeedStore>) =
        match config.database_url.as_deref() {
            Some(url) => {
                // Postgres 存储（需先执行 migrations）
                let store = Arc::new(PgFeedStore::connect(url).await?);
                (store.clone(), store)
            }
            None => {
                tracing::warn!(
                    target: "feedhub.api",
                    "FEEDHUB_DATABASE_URL not set, using in-memory store"
                );
                let store = Arc::new(InMemoryFeedStore::new());
                (store.clone(), store)
            }
        };

    let buffer_config = buffer_config(&config.buffer)?;
    let committer = BatchCommitter::new(channels.clone(), feeds.clone());
    let buffer = WriteBuffer::new(committer, buffer_config);
    // 缓冲关闭时不启动刷盘任务，所有写入同步直写
    let scheduler = config
        .buffer
        .enabled
        .then(|| FlushScheduler::spawn(buffer.clone()));

    let state = AppState {
        buffer,
        buffer_enabled: config.buffer.enabled,
        channels,
        feeds,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!(
        target: "feedhub.api",
        addr = %config.http_addr,
        buffer_enabled = config.buffer.enabled,
        "feedhub api listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    tracing::info!(target: "feedhub.api", "feedhub api stopped");
    Ok(())
}

fn buffer_config(settings: &BufferSettings) -> Result<BufferConfig, Box<dyn std::error::Error>> {
    let overflow_policy: OverflowPolicy = settings.on_overflow.parse()?;
    if settings.on_overflow == "block" {
        tracing::warn!(
            target: "feedhub.api",
            "overflow policy `block` is not supported, falling back to `fallback`"
        );
    }
    Ok(BufferConfig {
        max_queue_capacity: settings.max_queue,
        batch_size: settings.batch_size,
        flush_interval: Duration::from_millis(settings.flush_interval_ms),
        overflow_policy,
        shutdown_timeout: Duration::from_millis(settings.shutdown_timeout_ms),
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "feedhub.api", error = %err, "failed to listen for ctrl_c");
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "feedhub.api", "shutdown signal received");
}
