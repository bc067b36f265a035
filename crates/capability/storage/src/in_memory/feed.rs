//! 通道/规则/数据点内存实现
//!
//! 仅用于本地测试和演示。三类数据放在同一把锁下，
//! 提交时先整体校验，全部通过后才写入，保证批次原子性。

use crate::error::StorageError;
use crate::models::{ChannelRecord, FeedCommit, RuleRecord};
use crate::traits::{ChannelStore, FeedStore};
use domain::DataPoint;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct StoreState {
    channels: BTreeMap<i64, ChannelRecord>,
    rules: BTreeMap<i64, RuleRecord>,
    feeds: HashMap<i64, Vec<DataPoint>>,
}

/// 内存存储（通道、规则、数据点）
pub struct InMemoryFeedStore {
    state: RwLock<StoreState>,
    rejected_entries: RwLock<HashSet<(i64, i64)>>,
}

impl InMemoryFeedStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            rejected_entries: RwLock::new(HashSet::new()),
        }
    }

    /// 写入或覆盖通道
    pub fn insert_channel(&self, record: ChannelRecord) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        state.channels.insert(record.channel_id, record);
        Ok(())
    }

    /// 写入或覆盖规则
    pub fn insert_rule(&self, record: RuleRecord) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        state.rules.insert(record.rule_id, record);
        Ok(())
    }

    /// 读取通道当前状态（用于测试）
    pub fn channel(&self, channel_id: i64) -> Option<ChannelRecord> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.channels.get(&channel_id).cloned())
    }

    /// 读取规则当前状态（用于测试）
    pub fn rule(&self, rule_id: i64) -> Option<RuleRecord> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.rules.get(&rule_id).cloned())
    }

    /// 按 entry_id 升序返回通道全部数据点（用于测试）
    pub fn feeds(&self, channel_id: i64) -> Vec<DataPoint> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.feeds.get(&channel_id).cloned())
            .unwrap_or_default()
    }

    /// 全部数据点数量（用于测试）
    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|state| state.feeds.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 故障注入：提交中出现该 (channel_id, entry_id) 时整批失败（用于测试）
    pub fn reject_entry(&self, channel_id: i64, entry_id: i64) {
        if let Ok(mut rejected) = self.rejected_entries.write() {
            rejected.insert((channel_id, entry_id));
        }
    }
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_commit(
    state: &StoreState,
    rejected: &HashSet<(i64, i64)>,
    commit: &FeedCommit,
) -> Result<(), StorageError> {
    let mut last_entry: HashMap<i64, i64> = HashMap::new();
    for feed in &commit.feeds {
        if !state.channels.contains_key(&feed.channel_id) {
            return Err(StorageError::conflict(format!(
                "channel {} not found",
                feed.channel_id
            )));
        }
        if rejected.contains(&(feed.channel_id, feed.entry_id)) {
            return Err(StorageError::new(format!(
                "insert rejected for channel {} entry {}",
                feed.channel_id, feed.entry_id
            )));
        }
        let previous = match last_entry.get(&feed.channel_id) {
            Some(entry_id) => *entry_id,
            None => state
                .feeds
                .get(&feed.channel_id)
                .and_then(|items| items.last())
                .map(|item| item.entry_id)
                .unwrap_or(0),
        };
        if feed.entry_id <= previous {
            return Err(StorageError::conflict(format!(
                "entry_id {} not after {} for channel {}",
                feed.entry_id, previous, feed.channel_id
            )));
        }
        last_entry.insert(feed.channel_id, feed.entry_id);
    }
    for counter in &commit.channels {
        if !state.channels.contains_key(&counter.channel_id) {
            return Err(StorageError::conflict(format!(
                "channel {} not found",
                counter.channel_id
            )));
        }
    }
    for rule_state in &commit.rule_states {
        if !state.rules.contains_key(&rule_state.rule_id) {
            return Err(StorageError::conflict(format!(
                "rule {} not found",
                rule_state.rule_id
            )));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ChannelStore for InMemoryFeedStore {
    async fn find_channel(&self, channel_id: i64) -> Result<Option<ChannelRecord>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(state.channels.get(&channel_id).cloned())
    }

    async fn list_active_rules(&self, channel_id: i64) -> Result<Vec<RuleRecord>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut rules: Vec<RuleRecord> = state
            .rules
            .values()
            .filter(|rule| rule.channel_id == channel_id && rule.is_active)
            .cloned()
            .collect();
        rules.sort_by_key(|rule| (rule.priority, rule.rule_id));
        Ok(rules)
    }
}

#[async_trait::async_trait]
impl FeedStore for InMemoryFeedStore {
    async fn last_feed(&self, channel_id: i64) -> Result<Option<DataPoint>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(state
            .feeds
            .get(&channel_id)
            .and_then(|items| items.last())
            .cloned())
    }

    async fn list_feeds(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<DataPoint>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(state
            .feeds
            .get(&channel_id)
            .map(|items| items.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn commit_feeds(&self, commit: &FeedCommit) -> Result<usize, StorageError> {
        if commit.is_empty() {
            return Ok(0);
        }
        let rejected = self
            .rejected_entries
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        validate_commit(&state, &rejected, commit)?;

        for feed in &commit.feeds {
            state
                .feeds
                .entry(feed.channel_id)
                .or_default()
                .push(feed.clone());
        }
        for counter in &commit.channels {
            if let Some(channel) = state.channels.get_mut(&counter.channel_id) {
                channel.last_entry_id = counter.last_entry_id;
            }
        }
        for rule_state in &commit.rule_states {
            if let Some(rule) = state.rules.get_mut(&rule_state.rule_id) {
                rule.pid_integral = rule_state.pid_integral;
                rule.pid_last_error = rule_state.pid_last_error;
            }
        }
        Ok(commit.feeds.len())
    }
}
