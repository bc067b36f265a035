//! # Feedhub Pipeline 模块
//!
//! 遥测写路径：入队 → 批量提交 → 定时刷盘。
//!
//! - `WriteBuffer`：有界 FIFO 队列，`enqueue` 永不阻塞，队列满时按策略丢弃或直写
//! - `BatchCommitter`：按通道分配 entry_id、延续输出字段、执行规则，整批原子提交
//! - `FlushScheduler`：定时与按量刷盘，停机时有超时的全量排空
//!
//! 所有提交（刷盘与直写）在同一把提交锁上串行，entry_id 与 PID 状态不会并发修改。

pub mod buffer;
pub mod committer;
pub mod config;
pub mod metrics;
pub mod scheduler;

pub use buffer::{FlushResult, SubmitOutcome, WriteBuffer};
pub use committer::{BatchCommitter, CommitReport};
pub use config::{BufferConfig, OverflowPolicy};
pub use metrics::BufferStats;
pub use scheduler::{FlushScheduler, SchedulerHandle};

use feedhub_storage::StorageError;

/// Pipeline 处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("channel {0} not found")]
    ChannelNotFound(i64),
    #[error("invalid overflow policy: {0}")]
    InvalidOverflowPolicy(String),
}
