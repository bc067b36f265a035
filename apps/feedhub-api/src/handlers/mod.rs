//! Handlers 模块

pub mod buffer;
pub mod control;
pub mod feeds;
pub mod metrics;
pub mod update;

pub use buffer::*;
pub use control::*;
pub use feeds::*;
pub use metrics::*;
pub use update::*;

use axum::{Json, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
