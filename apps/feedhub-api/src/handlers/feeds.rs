//! 数据点读取
//!
//! - GET /channels/{id}/feeds?results=N

use api_contract::{ApiResponse, FeedDto, FeedsQuery};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::utils::response::{bad_request_error, feed_to_dto, not_found_error, storage_error};

const DEFAULT_RESULTS: i64 = 100;
const MAX_RESULTS: i64 = 8000;

#[derive(serde::Deserialize)]
pub struct ChannelPath {
    pub(crate) channel_id: i64,
}

pub async fn list_feeds(
    State(state): State<AppState>,
    Path(path): Path<ChannelPath>,
    Query(query): Query<FeedsQuery>,
) -> Response {
    let results = query.results.unwrap_or(DEFAULT_RESULTS);
    if !(1..=MAX_RESULTS).contains(&results) {
        return bad_request_error("results out of range");
    }
    match state.channels.find_channel(path.channel_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    }
    match state
        .feeds
        .list_feeds(path.channel_id, results as usize)
        .await
    {
        Ok(points) => {
            let data: Vec<FeedDto> = points.into_iter().map(feed_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => storage_error(err),
    }
}
