//! Pipeline source resolution
//!
//! A request names its YAML either inline (base64) or as a path on one of the
//! caller's filesystems. [`PipelineSource`] is the validated form of that
//! choice and [`SourceResolver`] turns it into bytes.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;
use strata_core::dto::pipeline::CreatePipeline;
use thiserror::Error;

use super::error::PipelineError;
use super::permission::Caller;
use crate::collaborators::{FileReader, FilesystemResolver, FsError};

pub const DEFAULT_SOURCE_PATH: &str = "./run.yaml";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("yamlRaw cannot be combined with {0}")]
    ConflictingSource(&'static str),

    #[error("decode yamlRaw failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("either yamlRaw or fsName must be set")]
    MissingFilesystem,

    #[error("{0}")]
    Filesystem(FsError),

    #[error("read {path} from filesystem {filesystem_id} failed: {source}")]
    Read {
        filesystem_id: String,
        path: String,
        #[source]
        source: FsError,
    },
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Filesystem(FsError::NotFound(id)) => {
                PipelineError::NotFound(format!("filesystem {id} not found"))
            }
            SourceError::Filesystem(FsError::AccessDenied(msg)) => {
                PipelineError::AccessDenied(msg)
            }
            other => PipelineError::InvalidArgument(other.to_string()),
        }
    }
}

/// Where the pipeline YAML comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    Inline { content: Vec<u8> },
    Filesystem { name: String, path: String },
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl PipelineSource {
    /// Picks the source out of the request fields; empty strings count as unset
    pub fn from_request(req: &CreatePipeline) -> Result<Self, SourceError> {
        let fs_name = non_empty(&req.fs_name);
        let yaml_path = non_empty(&req.yaml_path);

        if let Some(raw) = non_empty(&req.yaml_raw) {
            if yaml_path.is_some() {
                return Err(SourceError::ConflictingSource("yamlPath"));
            }
            if fs_name.is_some() {
                return Err(SourceError::ConflictingSource("fsName"));
            }
            let content = STANDARD.decode(raw)?;
            return Ok(PipelineSource::Inline { content });
        }

        let name = fs_name.ok_or(SourceError::MissingFilesystem)?;
        Ok(PipelineSource::Filesystem {
            name: name.to_string(),
            path: yaml_path.unwrap_or(DEFAULT_SOURCE_PATH).to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemRef {
    pub id: String,
    pub name: String,
}

/// Bytes of a pipeline definition and their provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub content: Vec<u8>,
    pub filesystem: Option<FilesystemRef>,
    pub source_path: Option<String>,
}

pub struct SourceResolver {
    filesystems: Arc<dyn FilesystemResolver>,
    files: Arc<dyn FileReader>,
}

impl SourceResolver {
    pub fn new(filesystems: Arc<dyn FilesystemResolver>, files: Arc<dyn FileReader>) -> Self {
        Self { filesystems, files }
    }

    pub async fn resolve(
        &self,
        caller: &Caller,
        source: PipelineSource,
        fs_owner: Option<&str>,
    ) -> Result<ResolvedSource, SourceError> {
        let (name, path) = match source {
            PipelineSource::Inline { content } => {
                return Ok(ResolvedSource {
                    content,
                    filesystem: None,
                    source_path: None,
                });
            }
            PipelineSource::Filesystem { name, path } => (name, path),
        };

        let filesystem_id = self
            .filesystems
            .resolve(caller, fs_owner, &name)
            .await
            .map_err(SourceError::Filesystem)?;

        let content = self
            .files
            .read_file(&filesystem_id, &path)
            .await
            .map_err(|source| SourceError::Read {
                filesystem_id: filesystem_id.clone(),
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            "Resolved {} bytes from {}:{}",
            content.len(),
            filesystem_id,
            path
        );

        Ok(ResolvedSource {
            content,
            filesystem: Some(FilesystemRef {
                id: filesystem_id,
                name,
            }),
            source_path: Some(path),
        })
    }
}
