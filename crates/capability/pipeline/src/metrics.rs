//! 写缓冲计数器。每个 `WriteBuffer` 实例各自持有，快照无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 缓冲统计快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub batches_committed: u64,
    pub flush_errors: u64,
    pub drops: u64,
    pub fallbacks: u64,
    pub points_committed: u64,
    pub points_failed: u64,
    pub points_skipped: u64,
    pub last_flush_duration: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct BufferMetrics {
    batches_committed: AtomicU64,
    flush_errors: AtomicU64,
    drops: AtomicU64,
    fallbacks: AtomicU64,
    points_committed: AtomicU64,
    points_failed: AtomicU64,
    points_skipped: AtomicU64,
    last_flush_duration_us: AtomicU64,
}

impl BufferMetrics {
    pub(crate) fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, committed: usize, skipped: usize) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.points_committed
            .fetch_add(committed as u64, Ordering::Relaxed);
        self.points_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_error(&self, failed: usize) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
        self.points_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_duration(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_flush_duration_us.store(micros, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, queue_depth: usize, queue_capacity: usize) -> BufferStats {
        BufferStats {
            queue_depth,
            queue_capacity,
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            points_committed: self.points_committed.load(Ordering::Relaxed),
            points_failed: self.points_failed.load(Ordering::Relaxed),
            points_skipped: self.points_skipped.load(Ordering::Relaxed),
            last_flush_duration: Duration::from_micros(
                self.last_flush_duration_us.load(Ordering::Relaxed),
            ),
        }
    }
}
