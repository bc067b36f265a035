//! 追踪、请求 ID 生成与进程级接入计数。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 接入指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub updates_received: u64,
    pub updates_queued: u64,
    pub updates_direct: u64,
    pub updates_dropped: u64,
    pub updates_rejected: u64,
    pub control_writes: u64,
    pub write_failures: u64,
    pub direct_write_latency_ms_total: u64,
    pub direct_write_latency_ms_count: u64,
}

/// 接入指标（HTTP 写入口）。缓冲内部计数见 `WriteBuffer::stats`。
pub struct TelemetryMetrics {
    updates_received: AtomicU64,
    updates_queued: AtomicU64,
    updates_direct: AtomicU64,
    updates_dropped: AtomicU64,
    updates_rejected: AtomicU64,
    control_writes: AtomicU64,
    write_failures: AtomicU64,
    direct_write_latency_ms_total: AtomicU64,
    direct_write_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            updates_received: AtomicU64::new(0),
            updates_queued: AtomicU64::new(0),
            updates_direct: AtomicU64::new(0),
            updates_dropped: AtomicU64::new(0),
            updates_rejected: AtomicU64::new(0),
            control_writes: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            direct_write_latency_ms_total: AtomicU64::new(0),
            direct_write_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            updates_received: self.updates_received.load(Ordering::Relaxed),
            updates_queued: self.updates_queued.load(Ordering::Relaxed),
            updates_direct: self.updates_direct.load(Ordering::Relaxed),
            updates_dropped: self.updates_dropped.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
            control_writes: self.control_writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            direct_write_latency_ms_total: self
                .direct_write_latency_ms_total
                .load(Ordering::Relaxed),
            direct_write_latency_ms_count: self
                .direct_write_latency_ms_count
                .load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录 /update 请求次数。
pub fn record_update_received() {
    metrics().updates_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录入队成功次数。
pub fn record_update_queued() {
    metrics().updates_queued.fetch_add(1, Ordering::Relaxed);
}

/// 记录同步直写次数（直写模式或溢出回退）。
pub fn record_update_direct() {
    metrics().updates_direct.fetch_add(1, Ordering::Relaxed);
}

/// 记录队列满被丢弃的次数。
pub fn record_update_dropped() {
    metrics().updates_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录参数非法被拒绝的次数。
pub fn record_update_rejected() {
    metrics().updates_rejected.fetch_add(1, Ordering::Relaxed);
}

/// 记录字段控制写入次数。
pub fn record_control_write() {
    metrics().control_writes.fetch_add(1, Ordering::Relaxed);
}

/// 记录同步写入失败次数。
pub fn record_write_failure() {
    metrics().write_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录同步直写延迟（毫秒）。
pub fn record_direct_write_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .direct_write_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .direct_write_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
