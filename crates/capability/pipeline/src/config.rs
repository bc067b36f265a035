use std::str::FromStr;
use std::time::Duration;

use crate::PipelineError;

/// 队列满时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// 直接丢弃，计入 drops。
    Drop,
    /// 绕过队列同步直写，计入 fallbacks。
    #[default]
    Fallback,
}

impl OverflowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Fallback => "fallback",
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = PipelineError;

    /// `block` 没有真正的阻塞实现，按 fallback 处理。
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "fallback" | "block" => Ok(Self::Fallback),
            other => Err(PipelineError::InvalidOverflowPolicy(other.to_string())),
        }
    }
}

/// 写缓冲参数。
#[derive(Debug, Clone)]
pub struct BufferConfig {
    pub max_queue_capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub overflow_policy: OverflowPolicy,
    pub shutdown_timeout: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_queue_capacity: 50_000,
            batch_size: 200,
            flush_interval: Duration::from_millis(100),
            overflow_policy: OverflowPolicy::Fallback,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl BufferConfig {
    pub(crate) fn sanitized(mut self) -> Self {
        if self.batch_size == 0 {
            self.batch_size = 1;
        }
        if self.max_queue_capacity < self.batch_size {
            self.max_queue_capacity = self.batch_size;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = Duration::from_millis(1);
        }
        self
    }
}
