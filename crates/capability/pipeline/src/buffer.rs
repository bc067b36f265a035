use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{BufferedWrite, DataPoint};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Notify, mpsc};

use crate::committer::BatchCommitter;
use crate::config::{BufferConfig, OverflowPolicy};
use crate::metrics::{BufferMetrics, BufferStats};
use crate::PipelineError;

/// 一次刷盘的结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushResult {
    pub drained: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// `submit` 的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 已入队，等待批量提交。
    Queued,
    /// 队列已满，按 fallback 策略同步直写。
    Committed(DataPoint),
    /// 队列已满，按 drop 策略丢弃。
    Dropped,
}

struct BufferInner {
    config: BufferConfig,
    sender: mpsc::Sender<BufferedWrite>,
    /// 接收端同时充当提交锁：定时、按量、手动刷盘与直写都在此串行。
    receiver: Mutex<mpsc::Receiver<BufferedWrite>>,
    committer: BatchCommitter,
    metrics: BufferMetrics,
    flush_requested: Notify,
}

/// 写缓冲：有界 FIFO 队列 + 批量提交。
#[derive(Clone)]
pub struct WriteBuffer {
    inner: Arc<BufferInner>,
}

impl WriteBuffer {
    pub fn new(committer: BatchCommitter, config: BufferConfig) -> Self {
        let config = config.sanitized();
        let (sender, receiver) = mpsc::channel(config.max_queue_capacity);
        let inner = BufferInner {
            config,
            sender,
            receiver: Mutex::new(receiver),
            committer,
            metrics: BufferMetrics::default(),
            flush_requested: Notify::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.inner.config
    }

    /// 非阻塞入队；队列满时立即返回 false 并按溢出策略计数。
    pub fn enqueue(&self, write: BufferedWrite) -> bool {
        self.try_enqueue(write).is_ok()
    }

    fn try_enqueue(&self, write: BufferedWrite) -> Result<(), BufferedWrite> {
        match self.inner.sender.try_send(write) {
            Ok(()) => {
                if self.queue_depth() >= self.inner.config.batch_size {
                    self.inner.flush_requested.notify_one();
                }
                Ok(())
            }
            Err(TrySendError::Full(write)) | Err(TrySendError::Closed(write)) => {
                match self.inner.config.overflow_policy {
                    OverflowPolicy::Drop => self.inner.metrics.record_drop(),
                    OverflowPolicy::Fallback => self.inner.metrics.record_fallback(),
                }
                tracing::debug!(
                    target: "feedhub.pipeline",
                    channel_id = write.channel_id,
                    policy = self.inner.config.overflow_policy.as_str(),
                    "write buffer full"
                );
                Err(write)
            }
        }
    }

    /// 入队，队列满时按溢出策略丢弃或同步直写。
    pub async fn submit(&self, write: BufferedWrite) -> Result<SubmitOutcome, PipelineError> {
        let write = match self.try_enqueue(write) {
            Ok(()) => return Ok(SubmitOutcome::Queued),
            Err(write) => write,
        };
        match self.inner.config.overflow_policy {
            OverflowPolicy::Drop => Ok(SubmitOutcome::Dropped),
            OverflowPolicy::Fallback => self.commit_direct(write).await.map(SubmitOutcome::Committed),
        }
    }

    /// 绕过队列的单条提交，与刷盘共用提交锁，返回真实 entry_id。
    pub async fn commit_direct(&self, write: BufferedWrite) -> Result<DataPoint, PipelineError> {
        let _guard = self.inner.receiver.lock().await;
        self.inner.committer.commit_one(write).await
    }

    /// 从队首取出最多 batch_size 条（drain_all 时取出全部）作为一个批次提交。
    ///
    /// 批次失败时整批回滚并丢弃，计入 flush_errors 与 points_failed。
    pub async fn flush(&self, drain_all: bool) -> FlushResult {
        let mut receiver = self.inner.receiver.lock().await;
        let limit = if drain_all {
            usize::MAX
        } else {
            self.inner.config.batch_size
        };
        let mut batch = Vec::new();
        while batch.len() < limit {
            match receiver.try_recv() {
                Ok(write) => batch.push(write),
                Err(_) => break,
            }
        }
        if batch.is_empty() {
            return FlushResult::default();
        }

        let drained = batch.len();
        let started = Instant::now();
        let result = self.inner.committer.commit(batch).await;
        drop(receiver);
        let elapsed = started.elapsed();
        self.inner.metrics.record_flush_duration(elapsed);

        match result {
            Ok(report) => {
                let committed = report.committed();
                self.inner.metrics.record_batch(committed, report.skipped);
                tracing::debug!(
                    target: "feedhub.pipeline",
                    drained,
                    committed,
                    skipped = report.skipped,
                    rule_failures = report.rule_failures,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "batch committed"
                );
                FlushResult {
                    drained,
                    committed,
                    skipped: report.skipped,
                    failed: 0,
                    elapsed,
                }
            }
            Err(err) => {
                self.inner.metrics.record_flush_error(drained);
                tracing::error!(
                    target: "feedhub.pipeline",
                    drained,
                    error = %err,
                    "batch commit failed, batch dropped"
                );
                FlushResult {
                    drained,
                    committed: 0,
                    skipped: 0,
                    failed: drained,
                    elapsed,
                }
            }
        }
    }

    pub fn queue_depth(&self) -> usize {
        let sender = &self.inner.sender;
        sender.max_capacity().saturating_sub(sender.capacity())
    }

    pub fn stats(&self) -> BufferStats {
        self.inner
            .metrics
            .snapshot(self.queue_depth(), self.inner.sender.max_capacity())
    }

    /// 等待按量刷盘通知（入队后队列深度达到 batch_size 时触发）。
    pub(crate) async fn flush_requested(&self) {
        self.inner.flush_requested.notified().await;
    }

    pub(crate) fn request_flush(&self) {
        self.inner.flush_requested.notify_one();
    }
}
