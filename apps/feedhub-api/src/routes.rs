//! 路由定义
//!
//! - 健康检查：/health
//! - 遥测写入：/update
//! - 通道数据：/channels/{id}/feeds, /channels/{id}/control
//! - 运维：/api/buffer/stats, /api/metrics

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::handlers::*;
use crate::middleware::request_context;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/update", get(update).post(update))
        .route("/channels/:channel_id/feeds", get(list_feeds))
        .route("/channels/:channel_id/control", post(control_field))
        .route("/api/buffer/stats", get(buffer_stats))
        .route("/api/metrics", get(get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(axum::middleware::from_fn(request_context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use feedhub_pipeline::{BatchCommitter, BufferConfig, OverflowPolicy, WriteBuffer};
    use feedhub_storage::{ChannelRecord, InMemoryFeedStore, RuleRecord};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(buffer_enabled: bool) -> (Arc<InMemoryFeedStore>, AppState) {
        let store = Arc::new(InMemoryFeedStore::new());
        store
            .insert_channel(ChannelRecord::new(5, "greenhouse"))
            .expect("channel");
        store
            .insert_rule(RuleRecord {
                rule_id: 1,
                channel_id: 5,
                rule_type: "math".to_string(),
                expression: Some("field3 = field1 * 2".to_string()),
                ..RuleRecord::default()
            })
            .expect("rule");
        let committer = BatchCommitter::new(store.clone(), store.clone());
        let buffer = WriteBuffer::new(
            committer,
            BufferConfig {
                max_queue_capacity: 10,
                batch_size: 10,
                flush_interval: Duration::from_secs(3600),
                overflow_policy: OverflowPolicy::Fallback,
                shutdown_timeout: Duration::from_secs(1),
            },
        );
        let state = AppState {
            buffer,
            buffer_enabled,
            channels: store.clone(),
            feeds: store.clone(),
        };
        (store, state)
    }

    async fn send(router: Router, request: Request<Body>) -> Response {
        router.oneshot(request).await.expect("response")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn body_text(response: Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).expect("json")
    }

    #[tokio::test]
    async fn buffered_update_is_queued_then_readable_after_flush() {
        let (store, state) = test_state(true);
        let buffer = state.buffer.clone();
        let router = create_router(state);

        let response = send(router.clone(), get_request("/update?channel_id=5&field1=4")).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));
        assert_eq!(body_text(response).await, "queued");
        assert!(store.is_empty());

        buffer.flush(false).await;

        let response = send(router, get_request("/channels/5/feeds?results=10")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        let feeds = value["data"].as_array().expect("feeds");
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0]["entryId"], Value::from(1));
        assert_eq!(feeds[0]["field3"], Value::from(8.0));
    }

    #[tokio::test]
    async fn direct_update_returns_entry_id() {
        let (store, state) = test_state(false);
        let router = create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/update?channel_id=5&field1=1.5&lat=10&status=ok")
            .body(Body::empty())
            .expect("request");
        let response = send(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "1");

        let point = store.feeds(5).pop().expect("point");
        assert_eq!(point.location.latitude, Some(10.0));
        assert_eq!(point.status.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn update_rejects_missing_or_unknown_channel() {
        let (_, state) = test_state(true);
        let router = create_router(state);

        let response = send(router.clone(), get_request("/update?field1=1")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(router, get_request("/update?channel_id=99&field1=1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn control_writes_single_field_through_rules() {
        let (_, state) = test_state(true);
        let router = create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/channels/5/control")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"field":"field3","value":1}"#))
            .expect("request");
        let response = send(router.clone(), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["data"]["entryId"], Value::from(1));
        // field3 由数学规则覆盖：field1 为空按 0 计算
        assert_eq!(value["data"]["value"], Value::from(0.0));

        let request = Request::builder()
            .method("POST")
            .uri("/channels/5/control")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"field":"field9","value":1}"#))
            .expect("request");
        let response = send(router, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn feeds_validates_results_range() {
        let (_, state) = test_state(true);
        let router = create_router(state);

        let response = send(router.clone(), get_request("/channels/5/feeds?results=0")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(router, get_request("/channels/6/feeds")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn buffer_stats_reports_queue() {
        let (_, state) = test_state(true);
        let router = create_router(state);

        send(router.clone(), get_request("/update?channel_id=5&field1=1")).await;
        let response = send(router, get_request("/api/buffer/stats")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["data"]["queueDepth"], Value::from(1));
        assert_eq!(value["data"]["queueCapacity"], Value::from(10));
        assert_eq!(value["data"]["overflowPolicy"], Value::from("fallback"));
    }
}
