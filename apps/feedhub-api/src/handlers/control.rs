//! 字段控制
//!
//! - POST /channels/{id}/control
//!
//! 单字段同步写入：只设置请求的字段，其余输出字段从上一条延续，
//! 规则照常执行，返回该字段的最终值。

use api_contract::{ApiResponse, ControlRequest, ControlResponse};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{BufferedWrite, FieldIndex, FieldValues};
use feedhub_telemetry::{record_control_write, record_write_failure};

use crate::AppState;
use crate::handlers::feeds::ChannelPath;
use crate::utils::now_epoch_ms;
use crate::utils::response::{bad_request_error, pipeline_error};

pub async fn control_field(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Json(req): Json<ControlRequest>,
) -> Response {
    let Some(field) = FieldIndex::parse(req.field.trim()) else {
        return bad_request_error("field must be one of field1..field8");
    };
    if req.value.is_some_and(|value| !value.is_finite()) {
        return bad_request_error("value must be a finite number");
    }

    let mut write = BufferedWrite::new(
        path.channel_id,
        FieldValues::default().with(field, req.value),
    );
    write.enqueued_at_ms = now_epoch_ms();
    match state.buffer.commit_direct(write).await {
        Ok(point) => {
            record_control_write();
            tracing::info!(
                target: "feedhub.api",
                channel_id = point.channel_id,
                entry_id = point.entry_id,
                field = %field,
                "field control written"
            );
            let response = ControlResponse {
                channel_id: point.channel_id,
                entry_id: point.entry_id,
                field: field.name().to_string(),
                value: point.fields.get(field),
            };
            (StatusCode::OK, Json(ApiResponse::success(response))).into_response()
        }
        Err(err) => {
            record_write_failure();
            pipeline_error(err)
        }
    }
}
