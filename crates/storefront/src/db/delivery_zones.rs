//! Delivery zone cache repository.
//!
//! Maps a postal code to the drive time last measured for it. Rows are
//! created lazily by delivery validation and only ever deactivated, never
//! deleted, by this service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::services::delivery::{DeliveryZoneStore, ZoneEntry};

/// `PostgreSQL` delivery zone store.
#[derive(Clone)]
pub struct PgDeliveryZoneStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ZoneRow {
    postal_code: String,
    estimated_minutes: i32,
    active: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ZoneRow> for ZoneEntry {
    type Error = RepositoryError;

    fn try_from(row: ZoneRow) -> Result<Self, Self::Error> {
        let estimated_minutes = u32::try_from(row.estimated_minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "zone {} has non-positive estimate {}",
                    row.postal_code, row.estimated_minutes
                ))
            })?;

        Ok(Self {
            postal_code: row.postal_code,
            estimated_minutes,
            active: row.active,
            updated_at: Some(row.updated_at),
        })
    }
}

fn stored_minutes(minutes: u32) -> Result<i32, RepositoryError> {
    i32::try_from(minutes)
        .ok()
        .filter(|m| *m > 0)
        .ok_or_else(|| RepositoryError::InvalidValue(format!("estimate {minutes} is out of range")))
}

impl PgDeliveryZoneStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All cached zones ordered by postal code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is invalid.
    pub async fn list(&self) -> Result<Vec<ZoneEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, ZoneRow>(
            "SELECT postal_code, estimated_minutes, active, updated_at
             FROM delivery_zones ORDER BY postal_code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ZoneEntry::try_from).collect()
    }

    /// Stop delivering to a postal code.
    ///
    /// The row is kept so later validations answer out-of-zone without a
    /// distance lookup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the postal code is not cached.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, postal_code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE delivery_zones SET active = FALSE, updated_at = NOW()
             WHERE postal_code = $1",
        )
        .bind(postal_code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryZoneStore for PgDeliveryZoneStore {
    #[instrument(skip(self))]
    async fn find(&self, postal_code: &str) -> Result<Option<ZoneEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, ZoneRow>(
            "SELECT postal_code, estimated_minutes, active, updated_at
             FROM delivery_zones WHERE postal_code = $1",
        )
        .bind(postal_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ZoneEntry::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn upsert(&self, postal_code: &str, minutes: u32) -> Result<(), RepositoryError> {
        let minutes = stored_minutes(minutes)?;

        // An operator deactivation survives re-measurement
        sqlx::query(
            "INSERT INTO delivery_zones (postal_code, estimated_minutes, active)
             VALUES ($1, $2, TRUE)
             ON CONFLICT (postal_code)
             DO UPDATE SET estimated_minutes = EXCLUDED.estimated_minutes, updated_at = NOW()",
        )
        .bind(postal_code)
        .bind(minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
