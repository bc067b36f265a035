//! # PostgreSQL 存储实现模块
//!
//! 本模块提供存储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 数据库模式要求
//!
//! 见 `migrations/0001_init.sql`：
//! - `channels`：通道表（id, name, last_entry_id）
//! - `automation_rules`：规则表（含 pid_integral / pid_last_error 状态列）
//! - `feeds`：数据点表（channel_id, entry_id 唯一）
//!
//! ## 事务
//!
//! `commit_feeds` 在一个事务内完成：
//! 1. 插入批次内全部数据点
//! 2. 更新每个通道的 `last_entry_id`
//! 3. 更新批次内求值过的 PID 规则状态
//!
//! 任一步失败时事务随 `Transaction` drop 回滚，批次不会部分落库。
//!
//! ## 安全考虑
//!
//! 所有查询使用参数绑定（`$1`, `$2` 等），列清单为编译期常量。

pub mod feed;

pub use feed::*;
