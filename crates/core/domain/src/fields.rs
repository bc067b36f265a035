//! 数据字段：field1..field8 的定长表示。
//!
//! 规则按字段名（"field1" ~ "field8"）引用字段，名称在规则加载时解析为
//! `FieldIndex`，求值阶段只做数组下标访问。

use std::fmt;

/// 每条数据的字段数量。
pub const FIELD_COUNT: usize = 8;

const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "field1", "field2", "field3", "field4", "field5", "field6", "field7", "field8",
];

/// 字段下标（0 起，对应 field1..field8）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldIndex(u8);

impl FieldIndex {
    /// 全部字段，按 field1..field8 顺序。
    pub const ALL: [FieldIndex; FIELD_COUNT] = [
        FieldIndex(0),
        FieldIndex(1),
        FieldIndex(2),
        FieldIndex(3),
        FieldIndex(4),
        FieldIndex(5),
        FieldIndex(6),
        FieldIndex(7),
    ];

    /// 从 0 起的下标构造。
    pub fn new(index: usize) -> Option<Self> {
        if index < FIELD_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// 从 1 起的字段编号构造（field1 => 1）。
    pub fn from_number(number: usize) -> Option<Self> {
        number.checked_sub(1).and_then(Self::new)
    }

    /// 解析字段名，仅接受 `field1` ~ `field8` 的精确写法。
    pub fn parse(name: &str) -> Option<Self> {
        FIELD_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(Self::new)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn number(self) -> usize {
        self.0 as usize + 1
    }

    pub fn name(self) -> &'static str {
        FIELD_NAMES[self.index()]
    }
}

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 八个可空数值字段。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldValues([Option<f64>; FIELD_COUNT]);

impl FieldValues {
    pub fn new(values: [Option<f64>; FIELD_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, field: FieldIndex) -> Option<f64> {
        self.0[field.index()]
    }

    pub fn set(&mut self, field: FieldIndex, value: Option<f64>) {
        self.0[field.index()] = value;
    }

    /// 链式设置（主要用于构造测试数据与请求映射）。
    pub fn with(mut self, field: FieldIndex, value: Option<f64>) -> Self {
        self.set(field, value);
        self
    }

    pub fn as_array(&self) -> &[Option<f64>; FIELD_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldIndex, Option<f64>)> + '_ {
        FieldIndex::ALL
            .iter()
            .map(move |field| (*field, self.get(*field)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl From<[Option<f64>; FIELD_COUNT]> for FieldValues {
    fn from(values: [Option<f64>; FIELD_COUNT]) -> Self {
        Self(values)
    }
}
