use std::sync::Arc;

use feedhub_pipeline::WriteBuffer;
use feedhub_storage::{ChannelStore, FeedStore};

/// 路由共享状态。
#[derive(Clone)]
pub struct AppState {
    pub buffer: WriteBuffer,
    /// 关闭时 /update 与控制写入都走同步直写。
    pub buffer_enabled: bool,
    pub channels: Arc<dyn ChannelStore>,
    pub feeds: Arc<dyn FeedStore>,
}
