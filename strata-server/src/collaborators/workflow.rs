//! Workflow validation
//!
//! The registry does not interpret workflow YAML beyond what it needs: the
//! pipeline name, the presence of entry points, and the main filesystem the
//! workflow will run on.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use super::filesystem::{FilesystemResolver, FsError};
use crate::service::Caller;

pub const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]{1,49}$";

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("pipeline name pattern is valid"));

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("parse workflow yaml failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("pipeline name {0:?} does not match {pattern}", pattern = NAME_PATTERN)]
    InvalidName(String),

    #[error("workflow has no entry_points")]
    NoEntryPoints,

    #[error("check main filesystem {name} failed: {source}")]
    MainFilesystem {
        name: String,
        #[source]
        source: FsError,
    },
}

/// Who is submitting the definition, used to resolve filesystems it names
pub struct ValidationContext<'a> {
    pub caller: &'a Caller,
    pub fs_owner: Option<&'a str>,
}

/// Validates a workflow definition and returns its canonical name
#[async_trait]
pub trait WorkflowValidator: Send + Sync {
    async fn validate(
        &self,
        content: &str,
        ctx: &ValidationContext<'_>,
    ) -> Result<String, ValidationError>;
}

#[derive(Debug, Deserialize)]
struct WorkflowSource {
    name: String,
    #[serde(default)]
    entry_points: serde_yaml::Mapping,
    #[serde(default)]
    fs_options: Option<FsOptions>,
}

#[derive(Debug, Deserialize)]
struct FsOptions {
    #[serde(default)]
    main_fs: Option<MainFs>,
}

#[derive(Debug, Deserialize)]
struct MainFs {
    #[serde(default)]
    name: String,
}

/// Validator for the YAML workflow format
pub struct YamlWorkflowValidator {
    filesystems: Arc<dyn FilesystemResolver>,
}

impl YamlWorkflowValidator {
    pub fn new(filesystems: Arc<dyn FilesystemResolver>) -> Self {
        Self { filesystems }
    }
}

#[async_trait]
impl WorkflowValidator for YamlWorkflowValidator {
    async fn validate(
        &self,
        content: &str,
        ctx: &ValidationContext<'_>,
    ) -> Result<String, ValidationError> {
        let source: WorkflowSource = serde_yaml::from_str(content)?;

        if !NAME_REGEX.is_match(&source.name) {
            return Err(ValidationError::InvalidName(source.name));
        }

        if source.entry_points.is_empty() {
            return Err(ValidationError::NoEntryPoints);
        }

        let main_fs = source
            .fs_options
            .and_then(|o| o.main_fs)
            .map(|fs| fs.name)
            .filter(|name| !name.is_empty());

        if let Some(name) = main_fs {
            self.filesystems
                .resolve(ctx.caller, ctx.fs_owner, &name)
                .await
                .map_err(|source| ValidationError::MainFilesystem { name, source })?;
        }

        Ok(source.name)
    }
}
