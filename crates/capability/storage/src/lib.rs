//! # Feedhub Storage 模块
//!
//! 写路径的持久化抽象层，支持多种存储后端实现。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：`ChannelStore`（通道与规则）、`FeedStore`（数据点）
//! 2. **数据模型层** (`models.rs`)：通道、规则、批次提交结构
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 5. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试和演示）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 核心约束
//!
//! - **批次原子性**：`FeedStore::commit_feeds` 要么写入全部数据点、通道计数器与
//!   PID 状态，要么全部不写
//! - **entry_id 单调**：同一通道的 entry_id 严格递增，内存实现会拒绝回退的提交
//! - **存储无关**：上层只依赖 trait，不关心后端是关系库、嵌入式还是远程服务
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use feedhub_storage::{ChannelRecord, FeedStore, InMemoryFeedStore};
//!
//! let store = InMemoryFeedStore::new();
//! store.insert_channel(ChannelRecord::new(5, "greenhouse"))?;
//! let last = store.last_feed(5).await?;
//! ```

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::InMemoryFeedStore;
pub use postgres::PgFeedStore;
