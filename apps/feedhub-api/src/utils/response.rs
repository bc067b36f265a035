//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, buffer_full_error, storage_error, pipeline_error
//! - DTO 转换：feed_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, FeedDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DataPoint, FieldIndex};
use feedhub_pipeline::PipelineError;
use feedhub_storage::StorageError;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 写缓冲已满且策略为 drop
pub fn buffer_full_error() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error("BUFFER.FULL", "write buffer full")),
    )
        .into_response()
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 同步写入错误响应
pub fn pipeline_error(err: PipelineError) -> Response {
    match err {
        PipelineError::ChannelNotFound(_) => not_found_error(),
        PipelineError::Storage(err) => storage_error(err),
        other => {
            let message = other.to_string();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
            )
                .into_response()
        }
    }
}

/// DataPoint 转 FeedDto
pub fn feed_to_dto(point: DataPoint) -> FeedDto {
    let fields = point.fields;
    let field = |number: usize| FieldIndex::from_number(number).and_then(|index| fields.get(index));
    FeedDto {
        channel_id: point.channel_id,
        entry_id: point.entry_id,
        created_at_ms: point.created_at_ms,
        field1: field(1),
        field2: field(2),
        field3: field(3),
        field4: field(4),
        field5: field(5),
        field6: field(6),
        field7: field(7),
        field8: field(8),
        latitude: point.location.latitude,
        longitude: point.location.longitude,
        elevation: point.location.elevation,
        status: point.status,
    }
}
