//! Postgres 通道/规则/数据点实现
//!
//! `commit_feeds` 在单个事务内写入数据点、更新通道计数器与 PID 状态。

use crate::error::StorageError;
use crate::models::{ChannelRecord, FeedCommit, RuleRecord};
use crate::traits::{ChannelStore, FeedStore};
use domain::{DataPoint, FIELD_COUNT, FieldValues, Location};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const FEED_COLUMNS: &str = "channel_id, entry_id, \
    (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
    field1, field2, field3, field4, field5, field6, field7, field8, \
    latitude, longitude, elevation, status";

const RULE_COLUMNS: &str = "id, channel_id, name, rule_type, priority, is_active, \
    trigger_field, condition, threshold_value, target_field, action_type, action_value, \
    pid_setpoint, pid_kp, pid_ki, pid_kd, pid_integral, pid_last_error, \
    pid_output_min, pid_output_max, expression";

pub struct PgFeedStore {
    pub pool: PgPool,
}

impl PgFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn feed_from_row(row: &PgRow) -> Result<DataPoint, StorageError> {
    let mut values = [None; FIELD_COUNT];
    for (index, slot) in values.iter_mut().enumerate() {
        let column = format!("field{}", index + 1);
        *slot = row.try_get::<Option<f64>, _>(column.as_str())?;
    }
    Ok(DataPoint {
        channel_id: row.try_get("channel_id")?,
        entry_id: row.try_get("entry_id")?,
        created_at_ms: row.try_get("created_at_ms")?,
        fields: FieldValues::new(values),
        location: Location {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            elevation: row.try_get("elevation")?,
        },
        status: row.try_get("status")?,
    })
}

fn rule_from_row(row: &PgRow) -> Result<RuleRecord, StorageError> {
    Ok(RuleRecord {
        rule_id: row.try_get("id")?,
        channel_id: row.try_get("channel_id")?,
        name: row.try_get("name")?,
        rule_type: row.try_get("rule_type")?,
        priority: row.try_get("priority")?,
        is_active: row.try_get("is_active")?,
        trigger_field: row.try_get("trigger_field")?,
        condition: row.try_get("condition")?,
        threshold_value: row.try_get("threshold_value")?,
        target_field: row.try_get("target_field")?,
        action_type: row.try_get("action_type")?,
        action_value: row.try_get("action_value")?,
        pid_setpoint: row.try_get("pid_setpoint")?,
        pid_kp: row.try_get("pid_kp")?,
        pid_ki: row.try_get("pid_ki")?,
        pid_kd: row.try_get("pid_kd")?,
        pid_integral: row.try_get("pid_integral")?,
        pid_last_error: row.try_get("pid_last_error")?,
        pid_output_min: row.try_get("pid_output_min")?,
        pid_output_max: row.try_get("pid_output_max")?,
        expression: row.try_get("expression")?,
    })
}

#[async_trait::async_trait]
impl ChannelStore for PgFeedStore {
    async fn find_channel(&self, channel_id: i64) -> Result<Option<ChannelRecord>, StorageError> {
        let row = sqlx::query("select id, name, last_entry_id from channels where id = $1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ChannelRecord {
            channel_id: row.try_get("id")?,
            name: row.try_get("name")?,
            last_entry_id: row.try_get("last_entry_id")?,
        }))
    }

    async fn list_active_rules(&self, channel_id: i64) -> Result<Vec<RuleRecord>, StorageError> {
        let sql = format!(
            "select {RULE_COLUMNS} from automation_rules \
             where channel_id = $1 and is_active = true \
             order by priority asc, id asc"
        );
        let rows = sqlx::query(&sql)
            .bind(channel_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(rule_from_row).collect()
    }
}

#[async_trait::async_trait]
impl FeedStore for PgFeedStore {
    async fn last_feed(&self, channel_id: i64) -> Result<Option<DataPoint>, StorageError> {
        let sql = format!(
            "select {FEED_COLUMNS} from feeds where channel_id = $1 \
             order by entry_id desc limit 1"
        );
        let row = sqlx::query(&sql)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(feed_from_row).transpose()
    }

    async fn list_feeds(
        &self,
        channel_id: i64,
        limit: usize,
    ) -> Result<Vec<DataPoint>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "select {FEED_COLUMNS} from feeds where channel_id = $1 \
             order by entry_id desc limit $2"
        );
        let rows = sqlx::query(&sql)
            .bind(channel_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(feed_from_row).collect()
    }

    async fn commit_feeds(&self, commit: &FeedCommit) -> Result<usize, StorageError> {
        if commit.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for feed in &commit.feeds {
            let fields = feed.fields.as_array();
            sqlx::query(
                "insert into feeds (channel_id, entry_id, created_at, \
                 field1, field2, field3, field4, field5, field6, field7, field8, \
                 latitude, longitude, elevation, status) \
                 values ($1, $2, to_timestamp($3 / 1000.0), \
                 $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            )
            .bind(feed.channel_id)
            .bind(feed.entry_id)
            .bind(feed.created_at_ms as f64)
            .bind(fields[0])
            .bind(fields[1])
            .bind(fields[2])
            .bind(fields[3])
            .bind(fields[4])
            .bind(fields[5])
            .bind(fields[6])
            .bind(fields[7])
            .bind(feed.location.latitude)
            .bind(feed.location.longitude)
            .bind(feed.location.elevation)
            .bind(&feed.status)
            .execute(&mut *tx)
            .await?;
        }
        for counter in &commit.channels {
            let result = sqlx::query(
                "update channels set last_entry_id = $2, updated_at = now() where id = $1",
            )
            .bind(counter.channel_id)
            .bind(counter.last_entry_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                // tx 在 drop 时回滚
                return Err(StorageError::conflict(format!(
                    "channel {} not found",
                    counter.channel_id
                )));
            }
        }
        for rule_state in &commit.rule_states {
            let result = sqlx::query(
                "update automation_rules set pid_integral = $2, pid_last_error = $3 \
                 where id = $1",
            )
            .bind(rule_state.rule_id)
            .bind(rule_state.pid_integral)
            .bind(rule_state.pid_last_error)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StorageError::conflict(format!(
                    "rule {} not found",
                    rule_state.rule_id
                )));
            }
        }
        tx.commit().await?;
        Ok(commit.feeds.len())
    }
}
