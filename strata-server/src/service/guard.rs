//! Delete guards
//!
//! A pipeline or version referenced by a running schedule must not be
//! deleted, and a pipeline never loses its last version on its own.
//! The checks are plain reads before the delete; a schedule created in
//! between is not fenced off.

use uuid::Uuid;

use super::error::{PipelineError, Result};
use crate::repository::{DefinitionStore, ScheduleLookup};

pub async fn ensure_pipeline_deletable(
    schedules: &dyn ScheduleLookup,
    pipeline_id: Uuid,
) -> Result<()> {
    let active = schedules
        .list_active_schedules(&[pipeline_id], &[])
        .await
        .map_err(|e| PipelineError::Internal(format!("list schedules failed: {e}")))?;

    if !active.is_empty() {
        return Err(PipelineError::ActionNotAllowed(format!(
            "delete pipeline[{pipeline_id}] failed, {} schedule(s) still running, stop them first",
            active.len()
        )));
    }

    Ok(())
}

pub async fn ensure_version_deletable(
    store: &dyn DefinitionStore,
    schedules: &dyn ScheduleLookup,
    pipeline_id: Uuid,
    version_id: Uuid,
) -> Result<()> {
    let count = store
        .count_pipeline_versions(pipeline_id)
        .await
        .map_err(|e| {
            PipelineError::Internal(format!(
                "count versions of pipeline[{pipeline_id}] failed: {e}"
            ))
        })?;

    if count <= 1 {
        return Err(PipelineError::ActionNotAllowed(format!(
            "delete pipeline[{pipeline_id}] version[{version_id}] failed, only one version left, delete the pipeline instead"
        )));
    }

    let active = schedules
        .list_active_schedules(&[pipeline_id], &[version_id])
        .await
        .map_err(|e| PipelineError::Internal(format!("list schedules failed: {e}")))?;

    if !active.is_empty() {
        return Err(PipelineError::ActionNotAllowed(format!(
            "delete pipeline[{pipeline_id}] version[{version_id}] failed, {} schedule(s) still running, stop them first",
            active.len()
        )));
    }

    Ok(())
}
