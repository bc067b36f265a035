//! 领域模型：通道数据点、缓冲写入与定长字段。

pub mod data;
pub mod fields;

pub use data::{BufferedWrite, DataPoint, Location};
pub use fields::{FIELD_COUNT, FieldIndex, FieldValues};
