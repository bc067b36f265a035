use crate::fields::FieldValues;

/// 位置信息（均可空）。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
}

/// 已入队、尚未提交的写入。
///
/// `enqueued_at_ms` 仅用于延迟统计，提交顺序以出队顺序（FIFO）为准。
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedWrite {
    pub channel_id: i64,
    pub fields: FieldValues,
    pub location: Location,
    pub status: Option<String>,
    pub enqueued_at_ms: i64,
}

impl BufferedWrite {
    pub fn new(channel_id: i64, fields: FieldValues) -> Self {
        Self {
            channel_id,
            fields,
            location: Location::default(),
            status: None,
            enqueued_at_ms: 0,
        }
    }
}

/// 通道数据点（feed）。
///
/// `entry_id` 与 `created_at_ms` 在提交时分配；提交前字段只会被规则引擎修改。
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub channel_id: i64,
    pub entry_id: i64,
    pub created_at_ms: i64,
    pub fields: FieldValues,
    pub location: Location,
    pub status: Option<String>,
}
