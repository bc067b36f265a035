//! 写缓冲统计
//!
//! - GET /api/buffer/stats

use api_contract::{ApiResponse, BufferStatsDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;

pub async fn buffer_stats(State(state): State<AppState>) -> Response {
    let stats = state.buffer.stats();
    let config = state.buffer.config();
    (
        StatusCode::OK,
        Json(ApiResponse::success(BufferStatsDto {
            enabled: state.buffer_enabled,
            overflow_policy: config.overflow_policy.as_str().to_string(),
            batch_size: config.batch_size,
            flush_interval_ms: config.flush_interval.as_millis() as u64,
            queue_depth: stats.queue_depth,
            queue_capacity: stats.queue_capacity,
            batches_committed: stats.batches_committed,
            flush_errors: stats.flush_errors,
            drops: stats.drops,
            fallbacks: stats.fallbacks,
            points_committed: stats.points_committed,
            points_failed: stats.points_failed,
            points_skipped: stats.points_skipped,
            last_flush_ms: stats.last_flush_duration.as_secs_f64() * 1000.0,
        })),
    )
        .into_response()
}
