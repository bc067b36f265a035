//! # Feedhub Automation 模块
//!
//! 写路径上的规则引擎。每个数据点在落库前按优先级执行通道的激活规则：
//!
//! - **condition**：触发字段满足比较条件时，对目标字段 set_value / increment / decrement
//! - **pid**：以触发字段为测量值计算 PID 输出写入目标字段，积分与上次误差随批次持久化
//! - **math**：`fieldN = <算术表达式>`，只允许字段引用、数字与白名单函数
//!
//! 规则从存储加载后先编译（`RuleSet::compile`），无效规则在加载时记日志并跳过；
//! 执行阶段单条规则出错只跳过该规则，不影响同一数据点的其他规则。

pub mod engine;
pub mod expr;
pub mod rule;

pub use engine::{EvaluationReport, RuleEngine, RuleSet};
pub use expr::{ExprError, MathExpression, round_half_even};
pub use rule::{Rule, RuleError, RuleKind, RuleOutcome};
