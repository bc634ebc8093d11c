use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{memory::MemoryStore, models::SensorReadingPayload};
use crate::db::models::{NewSensorReading, SensorReading};

/// Default cap for [`TelemetryStore::find_anomalies`].
pub const DEFAULT_ANOMALY_LIMIT: usize = 10;

const SELECT_COLUMNS: &str = r#"
    id, recorded_at,
    flow_inlet, flow_outlet,
    voltage_value, voltage_unit,
    current_value, current_unit,
    power_value, power_unit,
    temperature_value, temperature_unit,
    leak_detected, motor_status
"#;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Inclusive time range plus 1-based pagination. `limit` must be non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl HistoryQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct ReadingPage {
    pub data: Vec<SensorReading>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

/// `ceil(total / limit)`; zero when `limit` is zero.
pub fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

/// Pump efficiency derived from the most recent reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencySnapshot {
    /// `power.value` of the latest reading.
    pub power_consumption: f64,
    /// `flowRate.outlet` of the latest reading.
    pub flow_rate: f64,
    /// `flow_rate / power_consumption`, rounded to two decimals.
    /// Zero power yields a non-finite value, serialized as `null`.
    pub efficiency: f64,
}

impl EfficiencySnapshot {
    pub fn from_reading(r: &SensorReading) -> Self {
        Self {
            power_consumption: r.power_value,
            flow_rate: r.flow_outlet,
            efficiency: round2(r.flow_outlet / r.power_value),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// TelemetryStore
// ---------------------------------------------------------------------------

/// Time-series store of sensor readings. Cheap to clone.
#[derive(Clone)]
pub enum TelemetryStore {
    Postgres(PgPool),
    Memory(MemoryStore),
}

impl TelemetryStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            TelemetryStore::Postgres(_) => "postgres",
            TelemetryStore::Memory(_) => "memory",
        }
    }

    /// Append a reading. No deduplication.
    pub async fn insert(&self, new: NewSensorReading) -> Result<SensorReading> {
        let reading = match self {
            TelemetryStore::Postgres(pool) => {
                let sql = format!(
                    r#"
                    INSERT INTO sensor_readings
                        (recorded_at, flow_inlet, flow_outlet,
                         voltage_value, voltage_unit, current_value, current_unit,
                         power_value, power_unit, temperature_value, temperature_unit,
                         leak_detected, motor_status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    RETURNING {SELECT_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, SensorReading>(&sql)
                    .bind(new.recorded_at)
                    .bind(new.flow_inlet)
                    .bind(new.flow_outlet)
                    .bind(new.voltage_value)
                    .bind(&new.voltage_unit)
                    .bind(new.current_value)
                    .bind(&new.current_unit)
                    .bind(new.power_value)
                    .bind(&new.power_unit)
                    .bind(new.temperature_value)
                    .bind(&new.temperature_unit)
                    .bind(new.leak_detected)
                    .bind(new.motor_status)
                    .fetch_one(pool)
                    .await
                    .context("failed to insert sensor reading")?
            }
            TelemetryStore::Memory(mem) => {
                let reading = new.into_reading(Uuid::new_v4());
                mem.insert(reading.clone()).await;
                reading
            }
        };

        debug!(id = %reading.id, recorded_at = %reading.recorded_at, "Sensor reading stored");
        Ok(reading)
    }

    /// Resolve wire defaults (timestamp = now) and store the snapshot.
    pub async fn ingest(&self, payload: SensorReadingPayload) -> Result<SensorReading> {
        self.insert(payload.into_new_reading(Utc::now())).await
    }

    /// The reading with the greatest timestamp, if any.
    pub async fn latest(&self) -> Result<Option<SensorReading>> {
        match self {
            TelemetryStore::Postgres(pool) => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM sensor_readings ORDER BY recorded_at DESC LIMIT 1"
                );
                sqlx::query_as::<_, SensorReading>(&sql)
                    .fetch_optional(pool)
                    .await
                    .context("failed to fetch latest sensor reading")
            }
            TelemetryStore::Memory(mem) => Ok(mem.latest().await),
        }
    }

    /// Readings within `[start, end]`, newest first, one page at a time.
    pub async fn query(&self, q: &HistoryQuery) -> Result<ReadingPage> {
        let (data, total) = match self {
            TelemetryStore::Postgres(pool) => {
                let sql = format!(
                    r#"
                    SELECT {SELECT_COLUMNS}
                    FROM sensor_readings
                    WHERE ($1::timestamptz IS NULL OR recorded_at >= $1)
                      AND ($2::timestamptz IS NULL OR recorded_at <= $2)
                    ORDER BY recorded_at DESC
                    OFFSET $3
                    LIMIT $4
                    "#
                );
                let data = sqlx::query_as::<_, SensorReading>(&sql)
                    .bind(q.start)
                    .bind(q.end)
                    .bind(q.offset() as i64)
                    .bind(i64::from(q.limit))
                    .fetch_all(pool)
                    .await
                    .context("failed to query historical sensor readings")?;

                let total: i64 = sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*)
                    FROM sensor_readings
                    WHERE ($1::timestamptz IS NULL OR recorded_at >= $1)
                      AND ($2::timestamptz IS NULL OR recorded_at <= $2)
                    "#,
                )
                .bind(q.start)
                .bind(q.end)
                .fetch_one(pool)
                .await
                .context("failed to count historical sensor readings")?;

                (data, total.max(0) as u64)
            }
            TelemetryStore::Memory(mem) => mem.query(q).await,
        };

        Ok(ReadingPage {
            data,
            total,
            pages: page_count(total, q.limit),
            current_page: q.page,
        })
    }

    /// Leak-flagged readings, newest first, at most `limit`.
    pub async fn find_anomalies(&self, limit: usize) -> Result<Vec<SensorReading>> {
        match self {
            TelemetryStore::Postgres(pool) => {
                let sql = format!(
                    r#"
                    SELECT {SELECT_COLUMNS}
                    FROM sensor_readings
                    WHERE leak_detected
                    ORDER BY recorded_at DESC
                    LIMIT $1
                    "#
                );
                sqlx::query_as::<_, SensorReading>(&sql)
                    .bind(limit as i64)
                    .fetch_all(pool)
                    .await
                    .context("failed to fetch leak readings")
            }
            TelemetryStore::Memory(mem) => Ok(mem.leaks(limit).await),
        }
    }

    /// Efficiency of the latest reading, or `None` when the store is empty.
    pub async fn efficiency_snapshot(&self) -> Result<Option<EfficiencySnapshot>> {
        Ok(self.latest().await?.as_ref().map(EfficiencySnapshot::from_reading))
    }
}
