//! 接入指标快照
//!
//! - GET /api/metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use feedhub_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            updates_received: snapshot.updates_received,
            updates_queued: snapshot.updates_queued,
            updates_direct: snapshot.updates_direct,
            updates_dropped: snapshot.updates_dropped,
            updates_rejected: snapshot.updates_rejected,
            control_writes: snapshot.control_writes,
            write_failures: snapshot.write_failures,
            direct_write_latency_ms_total: snapshot.direct_write_latency_ms_total,
            direct_write_latency_ms_count: snapshot.direct_write_latency_ms_count,
        })),
    )
        .into_response()
}
