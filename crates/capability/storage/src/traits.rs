//! 存储接口 Trait 定义
//!
//! - ChannelStore：通道与规则查询（写路径只读）
//! - FeedStore：数据点读取与批次原子提交
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发
//! - `commit_feeds` 必须是全有或全无

use crate::error::StorageError;
use crate::models::{ChannelRecord, FeedCommit, RuleRecord};
use async_trait::async_trait;
use domain::DataPoint;

/// 通道存储接口
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// 查找通道
    async fn find_channel(&self, channel_id: i64) -> Result<Option<ChannelRecord>, StorageError>;

    /// 列出通道的启用规则，按 (priority, rule_id) 升序
    async fn list_active_rules(&self, channel_id: i64) -> Result<Vec<RuleRecord>, StorageError>;
}

/// 数据点存储接口
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// 通道最近一次提交的数据点（entry_id 最大者）
    async fn last_feed(&self, channel_id: i64) -> Result<Option<DataPoint>, StorageError>;

    /// 按 entry_id 倒序列出数据点
    async fn list_feeds(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<DataPoint>, StorageError>;

    /// 原子提交一个批次，返回写入的数据点数量
    async fn commit_feeds(&self, commit: &FeedCommit) -> Result<usize, StorageError>;
}
