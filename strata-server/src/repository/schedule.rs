//! Schedule Repository
//!
//! Read-only access to the scheduler's `schedules` table.

use async_trait::async_trait;
use sqlx::PgPool;
use strata_core::domain::schedule::{Schedule, ScheduleStatus};
use uuid::Uuid;

use super::Result;

/// Lookup of schedules that still reference a pipeline
#[async_trait]
pub trait ScheduleLookup: Send + Sync {
    /// Lists schedules in a non-final status
    ///
    /// Empty id lists match every pipeline / version.
    async fn list_active_schedules(
        &self,
        pipeline_ids: &[Uuid],
        version_ids: &[Uuid],
    ) -> Result<Vec<Schedule>>;
}

/// PostgreSQL implementation of ScheduleLookup
#[derive(Debug, Clone)]
pub struct PgScheduleLookup {
    pool: PgPool,
}

impl PgScheduleLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleLookup for PgScheduleLookup {
    async fn list_active_schedules(
        &self,
        pipeline_ids: &[Uuid],
        version_ids: &[Uuid],
    ) -> Result<Vec<Schedule>> {
        let statuses: Vec<&str> = ScheduleStatus::NOT_FINAL
            .iter()
            .map(|s| s.as_str())
            .collect();

        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT id, pipeline_id, pipeline_version_id, status
            FROM schedules
            WHERE (cardinality($1::UUID[]) = 0 OR pipeline_id = ANY($1))
              AND (cardinality($2::UUID[]) = 0 OR pipeline_version_id = ANY($2))
              AND status = ANY($3)
            ORDER BY pk ASC
            "#,
        )
        .bind(pipeline_ids)
        .bind(version_ids)
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        let schedules = rows
            .into_iter()
            .map(Schedule::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(schedules)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    pipeline_id: Uuid,
    pipeline_version_id: Uuid,
    status: String,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = String;

    fn try_from(row: ScheduleRow) -> std::result::Result<Self, Self::Error> {
        Ok(Schedule {
            id: row.id,
            pipeline_id: row.pipeline_id,
            pipeline_version_id: row.pipeline_version_id,
            status: row.status.parse()?,
        })
    }
}
