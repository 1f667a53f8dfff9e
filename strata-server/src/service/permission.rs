//! Permission checks
//!
//! Root identities may act on any pipeline; everyone else only on their own.

use std::collections::HashSet;
use std::sync::Arc;
use strata_core::domain::pipeline::{Pipeline, PipelineVersion};
use uuid::Uuid;

use super::error::{PipelineError, Result};
use crate::repository::DefinitionStore;

/// Identity of the user issuing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    name: String,
    root: bool,
}

impl Caller {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.root
    }
}

/// Knows which identities are root and hands out [`Caller`]s accordingly
#[derive(Debug, Clone)]
pub struct PermissionGate {
    root_users: Arc<HashSet<String>>,
}

impl PermissionGate {
    pub fn new(root_users: impl IntoIterator<Item = String>) -> Self {
        Self {
            root_users: Arc::new(root_users.into_iter().collect()),
        }
    }

    pub fn identify(&self, name: impl Into<String>) -> Caller {
        let name = name.into();
        let root = self.root_users.contains(&name);
        Caller { name, root }
    }

    pub fn has_access(caller: &Caller, owner: &str) -> bool {
        caller.is_root() || caller.name() == owner
    }
}

/// Loads a pipeline and checks that the caller may act on it
pub async fn check_pipeline(
    store: &dyn DefinitionStore,
    caller: &Caller,
    pipeline_id: Uuid,
) -> Result<Pipeline> {
    let pipeline = store
        .find_pipeline(pipeline_id)
        .await
        .map_err(|e| PipelineError::Internal(format!("get pipeline[{pipeline_id}] failed: {e}")))?
        .ok_or_else(|| PipelineError::NotFound(format!("pipeline[{pipeline_id}] not found")))?;

    if !PermissionGate::has_access(caller, &pipeline.owner) {
        return Err(PipelineError::AccessDenied(format!(
            "user[{}] has no access to pipeline[{}]",
            caller.name(),
            pipeline_id
        )));
    }

    Ok(pipeline)
}

/// Like [`check_pipeline`], additionally loading one of its versions
pub async fn check_pipeline_version(
    store: &dyn DefinitionStore,
    caller: &Caller,
    pipeline_id: Uuid,
    version_id: Uuid,
) -> Result<(Pipeline, PipelineVersion)> {
    let pipeline = check_pipeline(store, caller, pipeline_id).await?;

    let version = store
        .find_pipeline_version(pipeline_id, version_id)
        .await
        .map_err(|e| {
            PipelineError::Internal(format!(
                "get pipeline[{pipeline_id}] version[{version_id}] failed: {e}"
            ))
        })?
        .ok_or_else(|| {
            PipelineError::NotFound(format!(
                "pipeline[{pipeline_id}] version[{version_id}] not found"
            ))
        })?;

    Ok((pipeline, version))
}
