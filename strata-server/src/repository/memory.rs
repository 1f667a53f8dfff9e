//! In-memory repositories
//!
//! Back the registry when no database is configured (`STRATA_STORE=memory`)
//! and in tests. Row keys come from per-table counters, mirroring the
//! database sequences.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use strata_core::domain::pipeline::{Pipeline, PipelineVersion};
use strata_core::domain::schedule::{Schedule, ScheduleStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::pipeline::{DefinitionStore, NewPipeline, NewPipelineVersion, PipelineFilter};
use super::schedule::ScheduleLookup;
use super::{Result, StoreError};

#[derive(Default)]
struct Tables {
    last_pipeline_key: i64,
    last_version_key: i64,
    pipelines: BTreeMap<i64, Pipeline>,
    versions: BTreeMap<i64, PipelineVersion>,
}

impl Tables {
    fn pipeline_key(&self, id: Uuid) -> Option<i64> {
        self.pipelines
            .values()
            .find(|p| p.id == id)
            .map(|p| p.row_key)
    }

    fn insert_version(&mut self, pipeline_id: Uuid, new: NewPipelineVersion) -> PipelineVersion {
        self.last_version_key += 1;
        let now = Utc::now();

        let version = PipelineVersion {
            id: Uuid::new_v4(),
            pipeline_id,
            filesystem_id: new.filesystem_id,
            filesystem_name: new.filesystem_name,
            source_path: new.source_path,
            content: new.content,
            content_hash: new.content_hash,
            owner: new.owner,
            created_at: now,
            updated_at: now,
            row_key: self.last_version_key,
        };

        self.versions.insert(version.row_key, version.clone());
        version
    }

    fn version_matches(version: &PipelineVersion, pipeline_id: Uuid, fs_filter: &[String]) -> bool {
        version.pipeline_id == pipeline_id
            && (fs_filter.is_empty()
                || version
                    .filesystem_name
                    .as_ref()
                    .is_some_and(|name| fs_filter.contains(name)))
    }
}

/// In-memory implementation of DefinitionStore
///
/// A single lock guards both tables, so every write is atomic.
#[derive(Default)]
pub struct InMemoryDefinitionStore {
    tables: RwLock<Tables>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn create_pipeline(
        &self,
        new: NewPipeline,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)> {
        let mut tables = self.tables.write().await;

        if tables
            .pipelines
            .values()
            .any(|p| p.owner == new.owner && p.name == new.name)
        {
            return Err(StoreError::Duplicate);
        }

        tables.last_pipeline_key += 1;
        let now = Utc::now();
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            owner: new.owner,
            created_at: now,
            updated_at: now,
            row_key: tables.last_pipeline_key,
        };
        tables.pipelines.insert(pipeline.row_key, pipeline.clone());

        let version = tables.insert_version(pipeline.id, version);
        Ok((pipeline, version))
    }

    async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        description: &str,
        version: NewPipelineVersion,
    ) -> Result<(Pipeline, PipelineVersion)> {
        let mut tables = self.tables.write().await;

        let key = tables.pipeline_key(pipeline_id).ok_or(StoreError::NotFound)?;
        let pipeline = tables
            .pipelines
            .get_mut(&key)
            .ok_or(StoreError::NotFound)?;
        pipeline.description = description.to_string();
        pipeline.updated_at = Utc::now();
        let pipeline = pipeline.clone();

        let version = tables.insert_version(pipeline_id, version);
        Ok((pipeline, version))
    }

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>> {
        let tables = self.tables.read().await;
        Ok(tables.pipelines.values().find(|p| p.id == id).cloned())
    }

    async fn find_pipeline_by_name(&self, name: &str, owner: &str) -> Result<Option<Pipeline>> {
        let tables = self.tables.read().await;
        Ok(tables
            .pipelines
            .values()
            .find(|p| p.name == name && p.owner == owner)
            .cloned())
    }

    async fn find_pipeline_version(
        &self,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<PipelineVersion>> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .values()
            .find(|v| v.pipeline_id == pipeline_id && v.id == version_id)
            .cloned())
    }

    async fn list_pipelines(
        &self,
        after: Option<i64>,
        limit: usize,
        filter: &PipelineFilter,
    ) -> Result<Vec<Pipeline>> {
        let tables = self.tables.read().await;
        Ok(tables
            .pipelines
            .values()
            .filter(|p| after.is_none_or(|after| p.row_key > after))
            .filter(|p| filter.matches(p))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn is_last_pipeline_key(&self, key: i64, filter: &PipelineFilter) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(!tables
            .pipelines
            .range(key.saturating_add(1)..)
            .any(|(_, p)| filter.matches(p)))
    }

    async fn list_pipeline_versions(
        &self,
        pipeline_id: Uuid,
        after: Option<i64>,
        limit: usize,
        fs_filter: &[String],
    ) -> Result<Vec<PipelineVersion>> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .values()
            .filter(|v| after.is_none_or(|after| v.row_key > after))
            .filter(|v| Tables::version_matches(v, pipeline_id, fs_filter))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn is_last_pipeline_version_key(
        &self,
        pipeline_id: Uuid,
        key: i64,
        fs_filter: &[String],
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(!tables
            .versions
            .range(key.saturating_add(1)..)
            .any(|(_, v)| Tables::version_matches(v, pipeline_id, fs_filter)))
    }

    async fn count_pipeline_versions(&self, pipeline_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .values()
            .filter(|v| v.pipeline_id == pipeline_id)
            .count() as i64)
    }

    async fn delete_pipeline(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;

        let key = tables.pipeline_key(id).ok_or(StoreError::NotFound)?;
        tables.pipelines.remove(&key);
        tables.versions.retain(|_, v| v.pipeline_id != id);
        Ok(())
    }

    async fn delete_pipeline_version(&self, pipeline_id: Uuid, version_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;

        let key = tables
            .versions
            .values()
            .find(|v| v.pipeline_id == pipeline_id && v.id == version_id)
            .map(|v| v.row_key)
            .ok_or(StoreError::NotFound)?;
        tables.versions.remove(&key);
        Ok(())
    }
}

/// In-memory implementation of ScheduleLookup
///
/// Schedules are owned by the scheduler, which only writes to PostgreSQL, so
/// this backend never sees any and the delete guards always pass. Tests seed
/// it through `upsert`.
#[derive(Default)]
pub struct InMemoryScheduleLookup {
    schedules: RwLock<Vec<Schedule>>,
}

impl InMemoryScheduleLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a schedule, replacing any schedule with the same id
    #[cfg(test)]
    pub async fn upsert(&self, schedule: Schedule) {
        let mut schedules = self.schedules.write().await;
        schedules.retain(|s| s.id != schedule.id);
        schedules.push(schedule);
    }
}

#[async_trait]
impl ScheduleLookup for InMemoryScheduleLookup {
    async fn list_active_schedules(
        &self,
        pipeline_ids: &[Uuid],
        version_ids: &[Uuid],
    ) -> Result<Vec<Schedule>> {
        let schedules = self.schedules.read().await;
        Ok(schedules
            .iter()
            .filter(|s| pipeline_ids.is_empty() || pipeline_ids.contains(&s.pipeline_id))
            .filter(|s| version_ids.is_empty() || version_ids.contains(&s.pipeline_version_id))
            .filter(|s| ScheduleStatus::NOT_FINAL.contains(&s.status))
            .cloned()
            .collect())
    }
}
