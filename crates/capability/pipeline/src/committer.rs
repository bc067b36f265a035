//! 批次提交：分配 entry_id、延续输出字段、执行规则，然后整批原子落库。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{BufferedWrite, DataPoint};
use feedhub_automation::{RuleEngine, RuleSet};
use feedhub_storage::{ChannelCounter, ChannelStore, FeedCommit, FeedStore};

use crate::PipelineError;

/// 一次提交的结果。
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    /// 已落库的数据点，按出队顺序。
    pub points: Vec<DataPoint>,
    /// 通道不存在而跳过的写入数。
    pub skipped: usize,
    /// 执行出错（已跳过）的规则次数。
    pub rule_failures: usize,
}

impl CommitReport {
    pub fn committed(&self) -> usize {
        self.points.len()
    }
}

/// 批次内单个通道的状态。
struct ChannelContext {
    initial_entry_id: i64,
    last_entry_id: i64,
    rules: RuleSet,
    /// 该通道最近的数据点：批次内已暂存的优先，否则为最近一次已提交的。
    last_point: Option<DataPoint>,
}

#[derive(Clone)]
pub struct BatchCommitter {
    channels: Arc<dyn ChannelStore>,
    feeds: Arc<dyn FeedStore>,
    engine: RuleEngine,
}

impl BatchCommitter {
    pub fn new(channels: Arc<dyn ChannelStore>, feeds: Arc<dyn FeedStore>) -> Self {
        Self {
            channels,
            feeds,
            engine: RuleEngine::new(),
        }
    }

    /// 提交一个批次；通道不存在的写入被跳过，其余整体提交或整体回滚。
    pub async fn commit(&self, batch: Vec<BufferedWrite>) -> Result<CommitReport, PipelineError> {
        self.commit_batch(batch, false).await
    }

    /// 单条直写（直写模式与溢出回退），通道不存在时返回错误。
    pub async fn commit_one(&self, write: BufferedWrite) -> Result<DataPoint, PipelineError> {
        let channel_id = write.channel_id;
        let mut report = self.commit_batch(vec![write], true).await?;
        report
            .points
            .pop()
            .ok_or(PipelineError::ChannelNotFound(channel_id))
    }

    async fn commit_batch(
        &self,
        batch: Vec<BufferedWrite>,
        require_channel: bool,
    ) -> Result<CommitReport, PipelineError> {
        let mut report = CommitReport::default();
        let mut contexts: HashMap<i64, Option<ChannelContext>> = HashMap::new();
        let mut staged = Vec::with_capacity(batch.len());
        let created_at_ms = now_epoch_ms();

        for write in batch {
            let channel_id = write.channel_id;
            if !contexts.contains_key(&channel_id) {
                let context = self.load_context(channel_id).await?;
                contexts.insert(channel_id, context);
            }
            let Some(Some(context)) = contexts.get_mut(&channel_id) else {
                if require_channel {
                    return Err(PipelineError::ChannelNotFound(channel_id));
                }
                report.skipped += 1;
                tracing::warn!(
                    target: "feedhub.pipeline",
                    channel_id,
                    "channel not found, buffered write skipped"
                );
                continue;
            };

            let mut fields = write.fields;
            for field in context.rules.output_fields() {
                if fields.get(*field).is_none() {
                    let previous = context
                        .last_point
                        .as_ref()
                        .and_then(|point| point.fields.get(*field));
                    fields.set(*field, previous);
                }
            }

            context.last_entry_id += 1;
            let mut point = DataPoint {
                channel_id,
                entry_id: context.last_entry_id,
                created_at_ms,
                fields,
                location: write.location,
                status: write.status,
            };
            let evaluation = self.engine.evaluate(&mut context.rules, &mut point);
            report.rule_failures += evaluation.failed;

            context.last_point = Some(point.clone());
            staged.push(point);
        }

        if staged.is_empty() {
            return Ok(report);
        }

        let mut commit = FeedCommit {
            feeds: staged,
            ..FeedCommit::default()
        };
        for (channel_id, context) in &contexts {
            let Some(context) = context else { continue };
            if context.last_entry_id > context.initial_entry_id {
                commit.channels.push(ChannelCounter {
                    channel_id: *channel_id,
                    last_entry_id: context.last_entry_id,
                });
            }
            commit.rule_states.extend(context.rules.state_records());
        }
        commit.channels.sort_by_key(|counter| counter.channel_id);

        self.feeds.commit_feeds(&commit).await?;
        report.points = commit.feeds;
        Ok(report)
    }

    async fn load_context(&self, channel_id: i64) -> Result<Option<ChannelContext>, PipelineError> {
        let Some(channel) = self.channels.find_channel(channel_id).await? else {
            return Ok(None);
        };
        let records = self.channels.list_active_rules(channel_id).await?;
        let rules = RuleSet::compile(channel_id, &records);
        // 只有存在输出字段时才需要读上一条数据
        let last_point = if rules.output_fields().is_empty() {
            None
        } else {
            self.feeds.last_feed(channel_id).await?
        };
        Ok(Some(ChannelContext {
            initial_entry_id: channel.last_entry_id,
            last_entry_id: channel.last_entry_id,
            rules,
            last_point,
        }))
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
