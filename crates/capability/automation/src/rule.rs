//! 规则编译：把 `RuleRecord` 的字符串配置校验并转换为强类型规则。

use domain::{FieldIndex, FieldValues};
use feedhub_storage::{RuleRecord, RuleStateRecord};

use crate::expr::{ExprError, MathExpression, round_half_even};

/// 规则输出保留的小数位数。
pub const OUTPUT_DECIMALS: i32 = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("unknown rule type: {0}")]
    UnknownType(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
    #[error("invalid expression: {0}")]
    Expression(#[from] ExprError),
}

/// 条件比较符。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

impl Comparison {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
        }
    }
}

/// 条件动作。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// 写入动作值；未配置动作值时写入空值。
    SetValue(Option<f64>),
    Increment(f64),
    Decrement(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRule {
    pub trigger: FieldIndex,
    pub comparison: Comparison,
    pub threshold: f64,
    pub target: FieldIndex,
    pub action: Action,
}

/// PID 控制器的跨数据点状态。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    pub integral: f64,
    pub last_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PidRule {
    pub trigger: FieldIndex,
    pub target: FieldIndex,
    pub setpoint: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub output_min: f64,
    pub output_max: f64,
    pub state: PidState,
    /// 本次加载后是否推进过状态（需要随批次落库）。
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Condition(ConditionRule),
    Pid(PidRule),
    Math(MathExpression),
}

/// 单条规则对一个数据点的执行结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Applied,
    /// 条件不满足或触发字段为空，数据点不变。
    Skipped,
}

/// 编译后的规则。
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub rule_id: i64,
    pub name: String,
    pub priority: i32,
    pub kind: RuleKind,
}

impl Rule {
    pub fn compile(record: &RuleRecord) -> Result<Self, RuleError> {
        let kind = match record.rule_type.trim() {
            "condition" => RuleKind::Condition(compile_condition(record)?),
            "pid" => RuleKind::Pid(compile_pid(record)?),
            "math" => {
                let source = record
                    .expression
                    .as_deref()
                    .ok_or(RuleError::Missing("expression"))?;
                RuleKind::Math(MathExpression::parse(source)?)
            }
            other => return Err(RuleError::UnknownType(other.to_string())),
        };
        Ok(Self {
            rule_id: record.rule_id,
            name: record.name.clone(),
            priority: record.priority,
            kind,
        })
    }

    /// 规则写入的字段。
    pub fn target(&self) -> FieldIndex {
        match &self.kind {
            RuleKind::Condition(rule) => rule.target,
            RuleKind::Pid(rule) => rule.target,
            RuleKind::Math(expr) => expr.target(),
        }
    }

    pub fn apply(&mut self, fields: &mut FieldValues) -> Result<RuleOutcome, RuleError> {
        match &mut self.kind {
            RuleKind::Condition(rule) => Ok(rule.apply(fields)),
            RuleKind::Pid(rule) => Ok(rule.apply(fields)),
            RuleKind::Math(expr) => {
                let value = expr.evaluate(fields)?;
                fields.set(expr.target(), Some(round_half_even(value, OUTPUT_DECIMALS)));
                Ok(RuleOutcome::Applied)
            }
        }
    }

    /// 需要持久化的 PID 状态；非 PID 规则或未推进过状态时为 None。
    pub fn state_record(&self) -> Option<RuleStateRecord> {
        match &self.kind {
            RuleKind::Pid(rule) if rule.dirty => Some(RuleStateRecord {
                rule_id: self.rule_id,
                pid_integral: rule.state.integral,
                pid_last_error: rule.state.last_error,
            }),
            _ => None,
        }
    }
}

impl ConditionRule {
    fn apply(&self, fields: &mut FieldValues) -> RuleOutcome {
        let Some(value) = fields.get(self.trigger) else {
            return RuleOutcome::Skipped;
        };
        if !self.comparison.matches(value, self.threshold) {
            return RuleOutcome::Skipped;
        }
        let current = fields.get(self.target).unwrap_or(0.0);
        let next = match self.action {
            Action::SetValue(value) => value,
            Action::Increment(step) => Some(current + step),
            Action::Decrement(step) => Some(current - step),
        };
        fields.set(self.target, next);
        RuleOutcome::Applied
    }
}

impl PidRule {
    fn apply(&mut self, fields: &mut FieldValues) -> RuleOutcome {
        let Some(measured) = fields.get(self.trigger) else {
            return RuleOutcome::Skipped;
        };
        let error = self.setpoint - measured;
        let integral = self.state.integral + error;
        let derivative = error - self.state.last_error;
        let output = self.kp * error + self.ki * integral + self.kd * derivative;
        // 先压上限再压下限，min > max 时结果为 min
        let output = output.min(self.output_max).max(self.output_min);

        fields.set(self.target, Some(round_half_even(output, OUTPUT_DECIMALS)));
        self.state = PidState {
            integral,
            last_error: error,
        };
        self.dirty = true;
        RuleOutcome::Applied
    }
}

fn parse_field(column: &'static str, value: Option<&str>) -> Result<FieldIndex, RuleError> {
    let value = value.ok_or(RuleError::Missing(column))?;
    FieldIndex::parse(value.trim()).ok_or_else(|| RuleError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn compile_condition(record: &RuleRecord) -> Result<ConditionRule, RuleError> {
    let trigger = parse_field("trigger_field", record.trigger_field.as_deref())?;
    let target = parse_field("target_field", record.target_field.as_deref())?;
    let condition = record
        .condition
        .as_deref()
        .ok_or(RuleError::Missing("condition"))?;
    let comparison = Comparison::parse(condition).ok_or_else(|| RuleError::InvalidValue {
        column: "condition",
        value: condition.to_string(),
    })?;
    let threshold = record
        .threshold_value
        .ok_or(RuleError::Missing("threshold_value"))?;
    let action_type = record
        .action_type
        .as_deref()
        .ok_or(RuleError::Missing("action_type"))?;
    let action = match action_type.trim() {
        "set_value" => Action::SetValue(record.action_value),
        "increment" => Action::Increment(
            record
                .action_value
                .ok_or(RuleError::Missing("action_value"))?,
        ),
        "decrement" => Action::Decrement(
            record
                .action_value
                .ok_or(RuleError::Missing("action_value"))?,
        ),
        other => {
            return Err(RuleError::InvalidValue {
                column: "action_type",
                value: other.to_string(),
            });
        }
    };
    Ok(ConditionRule {
        trigger,
        comparison,
        threshold,
        target,
        action,
    })
}

fn compile_pid(record: &RuleRecord) -> Result<PidRule, RuleError> {
    Ok(PidRule {
        trigger: parse_field("trigger_field", record.trigger_field.as_deref())?,
        target: parse_field("target_field", record.target_field.as_deref())?,
        setpoint: record.pid_setpoint.ok_or(RuleError::Missing("pid_setpoint"))?,
        kp: record.pid_kp.ok_or(RuleError::Missing("pid_kp"))?,
        ki: record.pid_ki.ok_or(RuleError::Missing("pid_ki"))?,
        kd: record.pid_kd.ok_or(RuleError::Missing("pid_kd"))?,
        output_min: record.pid_output_min,
        output_max: record.pid_output_max,
        state: PidState {
            integral: record.pid_integral,
            last_error: record.pid_last_error,
        },
        dirty: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldIndex {
        FieldIndex::parse(name).expect("field")
    }

    fn condition(action_type: &str, action_value: Option<f64>) -> RuleRecord {
        RuleRecord {
            rule_id: 1,
            channel_id: 5,
            rule_type: "condition".to_string(),
            trigger_field: Some("field1".to_string()),
            condition: Some(">".to_string()),
            threshold_value: Some(30.0),
            target_field: Some("field2".to_string()),
            action_type: Some(action_type.to_string()),
            action_value,
            ..RuleRecord::default()
        }
    }

    #[test]
    fn condition_set_increment_decrement() {
        let mut fields = FieldValues::default().with(field("field1"), Some(35.0));

        let mut set = Rule::compile(&condition("set_value", Some(1.0))).expect("compile");
        assert_eq!(set.apply(&mut fields), Ok(RuleOutcome::Applied));
        assert_eq!(fields.get(field("field2")), Some(1.0));

        let mut inc = Rule::compile(&condition("increment", Some(2.5))).expect("compile");
        inc.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field2")), Some(3.5));

        let mut dec = Rule::compile(&condition("decrement", Some(5.0))).expect("compile");
        dec.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field2")), Some(-1.5));

        let mut clear = Rule::compile(&condition("set_value", None)).expect("compile");
        clear.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field2")), None);
    }

    #[test]
    fn condition_skips_on_null_trigger_or_unmet_comparison() {
        let mut rule = Rule::compile(&condition("set_value", Some(1.0))).expect("compile");

        let mut empty = FieldValues::default();
        assert_eq!(rule.apply(&mut empty), Ok(RuleOutcome::Skipped));
        assert!(empty.is_empty());

        let mut cold = FieldValues::default().with(field("field1"), Some(30.0));
        assert_eq!(rule.apply(&mut cold), Ok(RuleOutcome::Skipped));
        assert_eq!(cold.get(field("field2")), None);
    }

    #[test]
    fn increment_treats_null_target_as_zero() {
        let mut rule = Rule::compile(&condition("increment", Some(1.0))).expect("compile");
        let mut fields = FieldValues::default().with(field("field1"), Some(31.0));
        rule.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field2")), Some(1.0));
    }

    #[test]
    fn invalid_records_fail_to_compile() {
        assert_eq!(
            Rule::compile(&condition("increment", None)),
            Err(RuleError::Missing("action_value"))
        );
        assert_eq!(
            Rule::compile(&condition("toggle", Some(1.0))),
            Err(RuleError::InvalidValue {
                column: "action_type",
                value: "toggle".to_string(),
            })
        );
        assert_eq!(
            Rule::compile(&RuleRecord {
                trigger_field: Some("field9".to_string()),
                ..condition("set_value", Some(1.0))
            }),
            Err(RuleError::InvalidValue {
                column: "trigger_field",
                value: "field9".to_string(),
            })
        );
        assert_eq!(
            Rule::compile(&RuleRecord {
                rule_type: "fuzzy".to_string(),
                ..RuleRecord::default()
            }),
            Err(RuleError::UnknownType("fuzzy".to_string()))
        );
        assert_eq!(
            Rule::compile(&RuleRecord {
                rule_type: "pid".to_string(),
                trigger_field: Some("field1".to_string()),
                target_field: Some("field3".to_string()),
                pid_setpoint: Some(25.0),
                pid_kp: Some(2.0),
                ..RuleRecord::default()
            }),
            Err(RuleError::Missing("pid_ki"))
        );
        assert!(matches!(
            Rule::compile(&RuleRecord {
                rule_type: "math".to_string(),
                expression: Some("field2 = field1; 1".to_string()),
                ..RuleRecord::default()
            }),
            Err(RuleError::Expression(ExprError::InvalidCharacter(';')))
        ));
    }

    #[test]
    fn pid_output_is_clamped_and_rounded() {
        let mut rule = Rule::compile(&RuleRecord {
            rule_id: 3,
            rule_type: "pid".to_string(),
            trigger_field: Some("field1".to_string()),
            target_field: Some("field3".to_string()),
            pid_setpoint: Some(25.0),
            pid_kp: Some(2.0),
            pid_ki: Some(0.1),
            pid_kd: Some(0.5),
            ..RuleRecord::default()
        })
        .expect("compile");
        assert_eq!(rule.state_record(), None);

        // error = 5, integral = 5, derivative = 5 => 10 + 0.5 + 2.5
        let mut fields = FieldValues::default().with(field("field1"), Some(20.0));
        rule.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field3")), Some(13.0));

        // 远低于设定值时压到上限
        let mut fields = FieldValues::default().with(field("field1"), Some(-100.0));
        rule.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field3")), Some(100.0));

        let state = rule.state_record().expect("dirty");
        assert_eq!(state.rule_id, 3);
        assert_eq!(state.pid_integral, 130.0);
        assert_eq!(state.pid_last_error, 125.0);
    }

    #[test]
    fn pid_skips_null_measurement_without_touching_state() {
        let mut rule = Rule::compile(&RuleRecord {
            rule_type: "pid".to_string(),
            trigger_field: Some("field1".to_string()),
            target_field: Some("field3".to_string()),
            pid_setpoint: Some(25.0),
            pid_kp: Some(1.0),
            pid_ki: Some(1.0),
            pid_kd: Some(1.0),
            pid_integral: 4.0,
            pid_last_error: 2.0,
            ..RuleRecord::default()
        })
        .expect("compile");

        let mut fields = FieldValues::default();
        assert_eq!(rule.apply(&mut fields), Ok(RuleOutcome::Skipped));
        assert_eq!(rule.state_record(), None);
        assert!(fields.is_empty());
    }

    #[test]
    fn math_output_is_rounded_to_two_decimals() {
        let mut rule = Rule::compile(&RuleRecord {
            rule_type: "math".to_string(),
            expression: Some("field4 = field1 / 3".to_string()),
            ..RuleRecord::default()
        })
        .expect("compile");
        assert_eq!(rule.target(), field("field4"));

        let mut fields = FieldValues::default().with(field("field1"), Some(10.0));
        rule.apply(&mut fields).expect("apply");
        assert_eq!(fields.get(field("field4")), Some(3.33));
    }
}
