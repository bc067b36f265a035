use std::collections::BTreeSet;

use domain::{DataPoint, FieldIndex};
use feedhub_storage::{RuleRecord, RuleStateRecord};

use crate::rule::{Rule, RuleOutcome};

/// 一个通道的有效规则集，按 (priority, rule_id) 升序执行。
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    channel_id: i64,
    rules: Vec<Rule>,
    output_fields: BTreeSet<FieldIndex>,
    invalid: usize,
}

impl RuleSet {
    /// 编译通道的规则；非激活规则被忽略，无法编译的规则记日志后跳过。
    pub fn compile(channel_id: i64, records: &[RuleRecord]) -> Self {
        let mut active: Vec<&RuleRecord> = records.iter().filter(|r| r.is_active).collect();
        active.sort_by_key(|r| (r.priority, r.rule_id));

        let mut rules = Vec::with_capacity(active.len());
        let mut output_fields = BTreeSet::new();
        let mut invalid = 0;
        for record in active {
            match Rule::compile(record) {
                Ok(rule) => {
                    output_fields.insert(rule.target());
                    rules.push(rule);
                }
                Err(err) => {
                    invalid += 1;
                    // 规则无效也不影响它声明的目标字段参与延续
                    if let Some(target) = record.target_field.as_deref().and_then(FieldIndex::parse)
                    {
                        output_fields.insert(target);
                    }
                    tracing::warn!(
                        target: "feedhub.automation",
                        channel_id,
                        rule_id = record.rule_id,
                        rule_type = %record.rule_type,
                        error = %err,
                        "invalid automation rule skipped"
                    );
                }
            }
        }

        Self {
            channel_id,
            rules,
            output_fields,
            invalid,
        }
    }

    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 加载时被跳过的无效规则数。
    pub fn invalid_count(&self) -> usize {
        self.invalid
    }

    /// 规则输出字段（激活规则目标字段的并集），新数据缺失时从上一条延续。
    pub fn output_fields(&self) -> &BTreeSet<FieldIndex> {
        &self.output_fields
    }

    /// 求值过程中推进过的 PID 状态。
    pub fn state_records(&self) -> Vec<RuleStateRecord> {
        self.rules.iter().filter_map(Rule::state_record).collect()
    }
}

/// 单个数据点的执行统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 规则引擎：依次执行规则集中的规则，单条规则失败只跳过该规则。
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, rules: &mut RuleSet, point: &mut DataPoint) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        for rule in rules.rules.iter_mut() {
            match rule.apply(&mut point.fields) {
                Ok(RuleOutcome::Applied) => report.applied += 1,
                Ok(RuleOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "feedhub.automation",
                        channel_id = point.channel_id,
                        entry_id = point.entry_id,
                        rule_id = rule.rule_id,
                        error = %err,
                        "automation rule failed"
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{FieldValues, Location};

    fn field(name: &str) -> FieldIndex {
        FieldIndex::parse(name).expect("field")
    }

    fn math(rule_id: i64, priority: i32, expression: &str) -> RuleRecord {
        RuleRecord {
            rule_id,
            channel_id: 5,
            rule_type: "math".to_string(),
            priority,
            expression: Some(expression.to_string()),
            ..RuleRecord::default()
        }
    }

    fn point(fields: FieldValues) -> DataPoint {
        DataPoint {
            channel_id: 5,
            entry_id: 1,
            created_at_ms: 0,
            fields,
            location: Location::default(),
            status: None,
        }
    }

    #[test]
    fn compile_orders_by_priority_then_id() {
        let records = vec![
            math(3, 1, "field4 = field3 + 1"),
            math(2, 0, "field3 = field2 + 1"),
            math(1, 0, "field2 = field1 + 1"),
            RuleRecord {
                is_active: false,
                ..math(4, 0, "field5 = 1")
            },
        ];
        let set = RuleSet::compile(5, &records);
        let ids: Vec<i64> = set.rules().iter().map(|r| r.rule_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(set.channel_id(), 5);
        assert!(!set.output_fields().contains(&field("field5")));
    }

    #[test]
    fn later_rules_see_earlier_outputs() {
        let mut set = RuleSet::compile(
            5,
            &[
                math(2, 1, "field3 = field2 * 10"),
                math(1, 0, "field2 = field1 + 1"),
            ],
        );
        let mut point = point(FieldValues::default().with(field("field1"), Some(1.0)));
        let report = RuleEngine::new().evaluate(&mut set, &mut point);

        assert_eq!(report.applied, 2);
        assert_eq!(point.fields.get(field("field2")), Some(2.0));
        assert_eq!(point.fields.get(field("field3")), Some(20.0));
    }

    #[test]
    fn invalid_rule_is_skipped_but_target_still_carried() {
        let records = vec![
            math(1, 0, "field2 = field1 + 1"),
            RuleRecord {
                target_field: Some("field6".to_string()),
                ..math(2, 0, "field6 = __import__('os')")
            },
            RuleRecord {
                rule_type: "script".to_string(),
                ..RuleRecord::default()
            },
        ];
        let set = RuleSet::compile(5, &records);

        assert_eq!(set.len(), 1);
        assert_eq!(set.invalid_count(), 2);
        let outputs: Vec<FieldIndex> = set.output_fields().iter().copied().collect();
        assert_eq!(outputs, vec![field("field2"), field("field6")]);
    }

    #[test]
    fn failing_rule_does_not_stop_evaluation() {
        let mut set = RuleSet::compile(
            5,
            &[
                math(1, 0, "field2 = field1 / 0"),
                math(2, 1, "field3 = field1 * 2"),
            ],
        );
        let mut point = point(FieldValues::default().with(field("field1"), Some(4.0)));
        let report = RuleEngine::new().evaluate(&mut set, &mut point);

        assert_eq!(
            report,
            EvaluationReport {
                applied: 1,
                skipped: 0,
                failed: 1,
            }
        );
        assert_eq!(point.fields.get(field("field2")), None);
        assert_eq!(point.fields.get(field("field3")), Some(8.0));
    }

    #[test]
    fn pid_state_records_only_after_evaluation() {
        let mut set = RuleSet::compile(
            5,
            &[RuleRecord {
                rule_id: 7,
                rule_type: "pid".to_string(),
                trigger_field: Some("field1".to_string()),
                target_field: Some("field2".to_string()),
                pid_setpoint: Some(25.0),
                pid_kp: Some(1.0),
                pid_ki: Some(0.0),
                pid_kd: Some(0.0),
                ..RuleRecord::default()
            }],
        );
        assert!(set.state_records().is_empty());

        let mut point = point(FieldValues::default().with(field("field1"), Some(20.0)));
        RuleEngine::new().evaluate(&mut set, &mut point);

        let states = set.state_records();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].rule_id, 7);
        assert_eq!(states[0].pid_integral, 5.0);
        assert_eq!(states[0].pid_last_error, 5.0);
        assert_eq!(point.fields.get(field("field2")), Some(5.0));
    }
}
