//! Pipeline Repository
//!
//! Handles all database operations related to pipelines and their versions.
//! Every multi-row write runs in a single transaction so a version can never
//! exist without its pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use strata_core::domain::pipeline::{Pipeline, PipelineVersion};
use uuid::Uuid;

use super::{Result, StoreError};

/// Fields of a pipeline supplied by the caller; ids, timestamps and row keys
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPipeline {
    pub name: String,
    pub description: String,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct NewPipelineVersion {
    pub filesystem_id: Option<String>,
    pub filesystem_name: Option<String>,
    pub source_path: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub owner: String,
}

/// Filters for pipeline listings. Empty lists match everything.
#[derive(Debug, Clone, Default)]
pub struct PipelineFilter {
    pub owners: Vec<String>,
    pub names: Vec<String>,
}

impl PipelineFilter {
    pub(crate) fn matches(&self, pipeline: &Pipeline) -> bool {
        (self.owners.is_empty() || self.owners.contains(&pipeline.owner))
            && (self.names.is_empty() || self.names.contains(&pipeline.name))
    }
}

/// Persistence for pipelines and pipeline versions
///
/// Listings are ordered by ascending row key and start strictly after `after`.
/// `is_last_*_key` answers whether any row with a greater key matches the same
/// filters, which is what decides if a page is truncated.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Inserts a pipeline and its first version atomically
    ///
    /// Fails with [`StoreError::Duplicate`] if the owner already has a
    /// pipeline with that name.
    async fn create_pipeline(
        &self,
        pipeline: NewPipeline,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)>;

    /// Updates the description and inserts a new version atomically
    async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        description: &str,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)>;

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>>;

    async fn find_pipeline_by_name(&self, name: &str, owner: &str) -> Result<Option<Pipeline>>;

    async fn find_pipeline_version(
        &self,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<PipelineVersion>>;

    async fn list_pipelines(
        &self,
        after: Option<i64>,
        limit: usize,
        filter: &PipelineFilter,
    ) -> Result<Vec<Pipeline>>;

    async fn is_last_pipeline_key(&self, key: i64, filter: &PipelineFilter) -> Result<bool>;

    async fn list_pipeline_versions(
        &self,
        pipeline_id: Uuid,
        after: Option<i64>,
        limit: usize,
        fs_filter: &[String],
    ) -> Result<Vec<PipelineVersion>>;

    async fn is_last_pipeline_version_key(
        &self,
        pipeline_id: Uuid,
        key: i64,
        fs_filter: &[String],
    ) -> Result<bool>;

    async fn count_pipeline_versions(&self, pipeline_id: Uuid) -> Result<i64>;

    /// Deletes a pipeline together with all of its versions
    async fn delete_pipeline(&self, id: Uuid) -> Result<()>;

    async fn delete_pipeline_version(&self, pipeline_id: Uuid, version_id: Uuid) -> Result<()>;
}

// =============================================================================
// PostgreSQL implementation
// =============================================================================

/// PostgreSQL implementation of DefinitionStore
#[derive(Debug, Clone)]
pub struct PgDefinitionStore {
    pool: PgPool,
}

impl PgDefinitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PIPELINE_COLUMNS: &str = "pk, id, name, description, owner, created_at, updated_at";

const VERSION_COLUMNS: &str = "pk, id, pipeline_id, fs_id, fs_name, yaml_path, pipeline_yaml, \
                               pipeline_hash, owner, created_at, updated_at";

#[async_trait]
impl DefinitionStore for PgDefinitionStore {
    async fn create_pipeline(
        &self,
        new: NewPipeline,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let pipeline_id = Uuid::new_v4();
        let pk: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO pipelines (id, name, description, owner, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING pk
            "#,
        )
        .bind(pipeline_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.owner)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_insert)?;

        let pipeline = Pipeline {
            id: pipeline_id,
            name: new.name,
            description: new.description,
            owner: new.owner,
            created_at: now,
            updated_at: now,
            row_key: pk,
        };

        let version = insert_version(&mut tx, pipeline_id, version, now).await?;
        tx.commit().await?;

        Ok((pipeline, version))
    }

    async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        description: &str,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "UPDATE pipelines SET description = $1, updated_at = $2 WHERE id = $3 \
             RETURNING {PIPELINE_COLUMNS}"
        ))
        .bind(description)
        .bind(now)
        .bind(pipeline_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let version = insert_version(&mut tx, pipeline_id, version, now).await?;
        tx.commit().await?;

        Ok((row.into(), version))
    }

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>> {
        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_pipeline_by_name(&self, name: &str, owner: &str) -> Result<Option<Pipeline>> {
        let row = sqlx::query_as::<_, PipelineRow>(&format!(
            "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE name = $1 AND owner = $2"
        ))
        .bind(name)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_pipeline_version(
        &self,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<PipelineVersion>> {
        let row = sqlx::query_as::<_, PipelineVersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM pipeline_versions WHERE pipeline_id = $1 AND id = $2"
        ))
        .bind(pipeline_id)
        .bind(version_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_pipelines(
        &self,
        after: Option<i64>,
        limit: usize,
        filter: &PipelineFilter,
    ) -> Result<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(&format!(
            r#"
            SELECT {PIPELINE_COLUMNS}
            FROM pipelines
            WHERE ($1::BIGINT IS NULL OR pk > $1)
              AND (cardinality($2::TEXT[]) = 0 OR owner = ANY($2))
              AND (cardinality($3::TEXT[]) = 0 OR name = ANY($3))
            ORDER BY pk ASC
            LIMIT $4
            "#
        ))
        .bind(after)
        .bind(&filter.owners)
        .bind(&filter.names)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn is_last_pipeline_key(&self, key: i64, filter: &PipelineFilter) -> Result<bool> {
        let is_last: bool = sqlx::query_scalar(
            r#"
            SELECT NOT EXISTS (
                SELECT 1 FROM pipelines
                WHERE pk > $1
                  AND (cardinality($2::TEXT[]) = 0 OR owner = ANY($2))
                  AND (cardinality($3::TEXT[]) = 0 OR name = ANY($3))
            )
            "#,
        )
        .bind(key)
        .bind(&filter.owners)
        .bind(&filter.names)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_last)
    }

    async fn list_pipeline_versions(
        &self,
        pipeline_id: Uuid,
        after: Option<i64>,
        limit: usize,
        fs_filter: &[String],
    ) -> Result<Vec<PipelineVersion>> {
        let rows = sqlx::query_as::<_, PipelineVersionRow>(&format!(
            r#"
            SELECT {VERSION_COLUMNS}
            FROM pipeline_versions
            WHERE pipeline_id = $1
              AND ($2::BIGINT IS NULL OR pk > $2)
              AND (cardinality($3::TEXT[]) = 0 OR fs_name = ANY($3))
            ORDER BY pk ASC
            LIMIT $4
            "#
        ))
        .bind(pipeline_id)
        .bind(after)
        .bind(fs_filter)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn is_last_pipeline_version_key(
        &self,
        pipeline_id: Uuid,
        key: i64,
        fs_filter: &[String],
    ) -> Result<bool> {
        let is_last: bool = sqlx::query_scalar(
            r#"
            SELECT NOT EXISTS (
                SELECT 1 FROM pipeline_versions
                WHERE pipeline_id = $1
                  AND pk > $2
                  AND (cardinality($3::TEXT[]) = 0 OR fs_name = ANY($3))
            )
            "#,
        )
        .bind(pipeline_id)
        .bind(key)
        .bind(fs_filter)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_last)
    }

    async fn count_pipeline_versions(&self, pipeline_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_versions WHERE pipeline_id = $1")
                .bind(pipeline_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn delete_pipeline(&self, id: Uuid) -> Result<()> {
        // pipeline_versions cascades through its foreign key
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_pipeline_version(&self, pipeline_id: Uuid, version_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM pipeline_versions WHERE pipeline_id = $1 AND id = $2")
            .bind(pipeline_id)
            .bind(version_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

async fn insert_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    pipeline_id: Uuid,
    new: NewPipelineVersion,
    now: DateTime<Utc>,
) -> Result<PipelineVersion> {
    let id = Uuid::new_v4();

    let pk: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO pipeline_versions (
            id, pipeline_id, fs_id, fs_name, yaml_path, pipeline_yaml,
            pipeline_hash, owner, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING pk
        "#,
    )
    .bind(id)
    .bind(pipeline_id)
    .bind(&new.filesystem_id)
    .bind(&new.filesystem_name)
    .bind(&new.source_path)
    .bind(&new.content)
    .bind(&new.content_hash)
    .bind(&new.owner)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .map_err(StoreError::from_insert)?;

    Ok(PipelineVersion {
        id,
        pipeline_id,
        filesystem_id: new.filesystem_id,
        filesystem_name: new.filesystem_name,
        source_path: new.source_path,
        content: new.content,
        content_hash: new.content_hash,
        owner: new.owner,
        created_at: now,
        updated_at: now,
        row_key: pk,
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    pk: i64,
    id: Uuid,
    name: String,
    description: String,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            name: row.name,
            description: row.description,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
            row_key: row.pk,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PipelineVersionRow {
    pk: i64,
    id: Uuid,
    pipeline_id: Uuid,
    fs_id: Option<String>,
    fs_name: Option<String>,
    yaml_path: Option<String>,
    pipeline_yaml: String,
    pipeline_hash: String,
    owner: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PipelineVersionRow> for PipelineVersion {
    fn from(row: PipelineVersionRow) -> Self {
        PipelineVersion {
            id: row.id,
            pipeline_id: row.pipeline_id,
            filesystem_id: row.fs_id,
            filesystem_name: row.fs_name,
            source_path: row.yaml_path,
            content: row.pipeline_yaml,
            content_hash: row.pipeline_hash,
            owner: row.owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
            row_key: row.pk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    // These run only against a live database: DATABASE_URL must be set.
    async fn test_store() -> Option<PgDefinitionStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = db::create_pool(&url).await.ok()?;
        db::run_migrations(&pool).await.ok()?;
        Some(PgDefinitionStore::new(pool))
    }

    fn new_version(owner: &str, content: &str) -> NewPipelineVersion {
        NewPipelineVersion {
            filesystem_id: None,
            filesystem_name: None,
            source_path: None,
            content: content.to_string(),
            content_hash: "hash".to_string(),
            owner: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_pg_create_update_delete() {
        let Some(store) = test_store().await else {
            eprintln!("skip (no DATABASE_URL)");
            return;
        };

        let owner = format!("pg-test-{}", Uuid::new_v4());
        let new = NewPipeline {
            name: "demo".to_string(),
            description: "first".to_string(),
            owner: owner.clone(),
        };

        let (pipeline, first) = store
            .create_pipeline(new.clone(), new_version(&owner, "name: demo"))
            .await
            .unwrap();
        assert_eq!(first.pipeline_id, pipeline.id);

        let duplicate = store
            .create_pipeline(new, new_version(&owner, "name: demo"))
            .await;
        assert!(matches!(duplicate, Err(StoreError::Duplicate)));

        let (updated, second) = store
            .update_pipeline(pipeline.id, "second", new_version(&owner, "name: demo\n"))
            .await
            .unwrap();
        assert_eq!(updated.description, "second");
        assert!(second.row_key > first.row_key);
        assert_eq!(store.count_pipeline_versions(pipeline.id).await.unwrap(), 2);

        let versions = store
            .list_pipeline_versions(pipeline.id, None, 10, &[])
            .await
            .unwrap();
        let ids: Vec<Uuid> = versions.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(
            store
                .is_last_pipeline_version_key(pipeline.id, second.row_key, &[])
                .await
                .unwrap()
        );

        store.delete_pipeline(pipeline.id).await.unwrap();
        assert!(store.find_pipeline(pipeline.id).await.unwrap().is_none());
        assert_eq!(store.count_pipeline_versions(pipeline.id).await.unwrap(), 0);
    }
}
