//! 数据模型
//!
//! 定义存储相关的数据模型：
//! - 通道模型：ChannelRecord（含 last_entry_id 计数器）
//! - 规则模型：RuleRecord（automation_rules 表的一行，含 PID 状态列）
//! - 提交模型：FeedCommit（一个批次的全部写入，整体原子提交）

use domain::DataPoint;

/// 通道记录。
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub channel_id: i64,
    pub name: String,
    /// 最近一次提交分配的 entry_id，下一条数据从它 +1 开始。
    pub last_entry_id: i64,
}

impl ChannelRecord {
    pub fn new(channel_id: i64, name: impl Into<String>) -> Self {
        Self {
            channel_id,
            name: name.into(),
            last_entry_id: 0,
        }
    }
}

/// 自动化规则记录。
///
/// 字段名与 `rule_type` 等仍是原始字符串，由规则引擎在加载时校验和编译。
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRecord {
    pub rule_id: i64,
    pub channel_id: i64,
    pub name: String,
    /// condition / pid / math
    pub rule_type: String,
    pub priority: i32,
    pub is_active: bool,

    pub trigger_field: Option<String>,
    /// >, <, ==, !=, >=, <=
    pub condition: Option<String>,
    pub threshold_value: Option<f64>,
    pub target_field: Option<String>,
    /// set_value / increment / decrement
    pub action_type: Option<String>,
    pub action_value: Option<f64>,

    pub pid_setpoint: Option<f64>,
    pub pid_kp: Option<f64>,
    pub pid_ki: Option<f64>,
    pub pid_kd: Option<f64>,
    pub pid_integral: f64,
    pub pid_last_error: f64,
    pub pid_output_min: f64,
    pub pid_output_max: f64,

    /// 形如 "field2 = field1 * 2 + 10"
    pub expression: Option<String>,
}

impl Default for RuleRecord {
    fn default() -> Self {
        Self {
            rule_id: 0,
            channel_id: 0,
            name: String::new(),
            rule_type: "condition".to_string(),
            priority: 0,
            is_active: true,
            trigger_field: None,
            condition: None,
            threshold_value: None,
            target_field: None,
            action_type: None,
            action_value: None,
            pid_setpoint: None,
            pid_kp: None,
            pid_ki: None,
            pid_kd: None,
            pid_integral: 0.0,
            pid_last_error: 0.0,
            pid_output_min: 0.0,
            pid_output_max: 100.0,
            expression: None,
        }
    }
}

/// PID 规则的持久化状态。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleStateRecord {
    pub rule_id: i64,
    pub pid_integral: f64,
    pub pid_last_error: f64,
}

/// 通道计数器更新。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounter {
    pub channel_id: i64,
    pub last_entry_id: i64,
}

/// 一个批次的提交内容：数据点、通道计数器与规则状态必须同时生效或同时回滚。
#[derive(Debug, Clone, Default)]
pub struct FeedCommit {
    pub feeds: Vec<DataPoint>,
    pub channels: Vec<ChannelCounter>,
    pub rule_states: Vec<RuleStateRecord>,
}

impl FeedCommit {
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty() && self.channels.is_empty() && self.rule_states.is_empty()
    }
}
