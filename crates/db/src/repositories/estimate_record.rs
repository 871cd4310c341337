use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estimator_core::domain::estimate::EstimateRecord;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use super::{EstimateRecordRepository, RepositoryError, StoredEstimateRecord};
use crate::DbPool;

/// SQLite-backed estimate log. Decimals are stored as TEXT to keep exact cents.
pub struct SqlEstimateRecordRepository {
    pool: DbPool,
}

impl SqlEstimateRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &SqliteRow) -> Result<StoredEstimateRecord, RepositoryError> {
        let recorded_at: String = row.try_get("recorded_at")?;
        let grand_total: String = row.try_get("grand_total")?;
        let total_labor: String = row.try_get("total_labor")?;
        let total_material: String = row.try_get("total_material")?;

        Ok(StoredEstimateRecord {
            id: row.try_get("id")?,
            record: EstimateRecord {
                timestamp: parse_timestamp(&recorded_at)?,
                estimator: row.try_get("estimator")?,
                customer_name: row.try_get("customer_name")?,
                customer_email: row.try_get("customer_email")?,
                customer_phone: row.try_get("customer_phone")?,
                services: row.try_get("services")?,
                grand_total: parse_decimal("grand_total", &grand_total)?,
                total_labor: parse_decimal("total_labor", &total_labor)?,
                total_material: parse_decimal("total_material", &total_material)?,
            },
        })
    }
}

#[async_trait]
impl EstimateRecordRepository for SqlEstimateRecordRepository {
    async fn append(&self, record: EstimateRecord) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO estimate_record (
                recorded_at,
                estimator,
                customer_name,
                customer_email,
                customer_phone,
                services,
                grand_total,
                total_labor,
                total_material
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(&record.estimator)
        .bind(&record.customer_name)
        .bind(&record.customer_email)
        .bind(&record.customer_phone)
        .bind(&record.services)
        .bind(record.grand_total.to_string())
        .bind(record.total_labor.to_string())
        .bind(record.total_material.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<StoredEstimateRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                recorded_at,
                estimator,
                customer_name,
                customer_email,
                customer_phone,
                services,
                grand_total,
                total_labor,
                total_material
            FROM estimate_record
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid {field} `{raw}`: {error}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid recorded_at `{raw}`: {error}")))
}
