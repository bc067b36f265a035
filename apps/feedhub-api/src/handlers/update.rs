//! 遥测写入口
//!
//! - GET|POST /update?channel_id=..&field1=..
//!
//! 缓冲开启时入队并返回 202 `queued`；缓冲关闭或队列满回退直写时
//! 同步提交并以纯文本返回 entry_id。

use std::time::Instant;

use api_contract::UpdateQuery;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{BufferedWrite, DataPoint, FieldValues, Location};
use feedhub_pipeline::SubmitOutcome;
use feedhub_telemetry::{
    record_direct_write_latency_ms, record_update_direct, record_update_dropped,
    record_update_queued, record_update_received, record_update_rejected, record_write_failure,
};

use crate::AppState;
use crate::utils::now_epoch_ms;
use crate::utils::response::{
    bad_request_error, buffer_full_error, not_found_error, pipeline_error, storage_error,
};

pub async fn update(State(state): State<AppState>, Query(query): Query<UpdateQuery>) -> Response {
    record_update_received();

    let Some(channel_id) = query.channel_id else {
        record_update_rejected();
        return bad_request_error("channel_id is required");
    };
    let values = query.fields();
    if values.iter().flatten().any(|value| !value.is_finite()) {
        record_update_rejected();
        return bad_request_error("field values must be finite numbers");
    }
    match state.channels.find_channel(channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            record_update_rejected();
            return not_found_error();
        }
        Err(err) => return storage_error(err),
    }

    let write = BufferedWrite {
        channel_id,
        fields: FieldValues::new(values),
        location: Location {
            latitude: query.lat,
            longitude: query.long,
            elevation: query.elevation,
        },
        status: query.status,
        enqueued_at_ms: now_epoch_ms(),
    };

    if !state.buffer_enabled {
        return commit_direct(&state, write).await;
    }

    let started = Instant::now();
    match state.buffer.submit(write).await {
        Ok(SubmitOutcome::Queued) => {
            record_update_queued();
            (StatusCode::ACCEPTED, "queued").into_response()
        }
        Ok(SubmitOutcome::Committed(point)) => {
            record_direct(started);
            entry_id_response(&point)
        }
        Ok(SubmitOutcome::Dropped) => {
            record_update_dropped();
            buffer_full_error()
        }
        Err(err) => {
            record_write_failure();
            tracing::warn!(target: "feedhub.api", channel_id, error = %err, "fallback write failed");
            pipeline_error(err)
        }
    }
}

async fn commit_direct(state: &AppState, write: BufferedWrite) -> Response {
    let channel_id = write.channel_id;
    let started = Instant::now();
    match state.buffer.commit_direct(write).await {
        Ok(point) => {
            record_direct(started);
            entry_id_response(&point)
        }
        Err(err) => {
            record_write_failure();
            tracing::warn!(target: "feedhub.api", channel_id, error = %err, "direct write failed");
            pipeline_error(err)
        }
    }
}

fn record_direct(started: Instant) {
    record_update_direct();
    record_direct_write_latency_ms(started.elapsed().as_millis() as u64);
}

fn entry_id_response(point: &DataPoint) -> Response {
    (StatusCode::OK, point.entry_id.to_string()).into_response()
}
