//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// /update 查询参数。
///
/// 参数名沿用设备端固件的写法（channel_id、field1..field8、lat、long）。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    pub channel_id: Option<i64>,
    pub field1: Option<f64>,
    pub field2: Option<f64>,
    pub field3: Option<f64>,
    pub field4: Option<f64>,
    pub field5: Option<f64>,
    pub field6: Option<f64>,
    pub field7: Option<f64>,
    pub field8: Option<f64>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub elevation: Option<f64>,
    pub status: Option<String>,
}

impl UpdateQuery {
    /// 按 field1..field8 顺序返回字段值。
    pub fn fields(&self) -> [Option<f64>; 8] {
        [
            self.field1,
            self.field2,
            self.field3,
            self.field4,
            self.field5,
            self.field6,
            self.field7,
            self.field8,
        ]
    }
}

/// 数据点读取参数。
#[derive(Debug, Default, Deserialize)]
pub struct FeedsQuery {
    pub results: Option<i64>,
}

/// 数据点返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDto {
    pub channel_id: i64,
    pub entry_id: i64,
    pub created_at_ms: i64,
    pub field1: Option<f64>,
    pub field2: Option<f64>,
    pub field3: Option<f64>,
    pub field4: Option<f64>,
    pub field5: Option<f64>,
    pub field6: Option<f64>,
    pub field7: Option<f64>,
    pub field8: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub status: Option<String>,
}

/// 字段控制请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub field: String,
    pub value: Option<f64>,
}

/// 字段控制返回结构：规则执行后该字段的最终值。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub channel_id: i64,
    pub entry_id: i64,
    pub field: String,
    pub value: Option<f64>,
}

/// 写缓冲统计。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferStatsDto {
    pub enabled: bool,
    pub overflow_policy: String,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub batches_committed: u64,
    pub flush_errors: u64,
    pub drops: u64,
    pub fallbacks: u64,
    pub points_committed: u64,
    pub points_failed: u64,
    pub points_skipped: u64,
    pub last_flush_ms: f64,
}

/// 接入指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
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
