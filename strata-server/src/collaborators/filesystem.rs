//! Filesystem access
//!
//! Pipelines can be read from a named filesystem owned by a user. Resolving
//! the name yields a filesystem id, reading goes through that id.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::service::Caller;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("filesystem {0} not found")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps a filesystem name to its id on behalf of a caller
#[async_trait]
pub trait FilesystemResolver: Send + Sync {
    /// `owner` selects another user's filesystem, which only root may do
    async fn resolve(
        &self,
        caller: &Caller,
        owner: Option<&str>,
        name: &str,
    ) -> Result<String, FsError>;
}

/// Reads a file from a resolved filesystem
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read_file(&self, filesystem_id: &str, path: &str) -> Result<Vec<u8>, FsError>;
}

/// Filesystems backed by local directories
///
/// Each filesystem is a directory named after its id, `fs-<owner>-<name>`,
/// directly under `root`.
#[derive(Debug, Clone)]
pub struct LocalFilesystems {
    root: PathBuf,
}

impl LocalFilesystems {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn filesystem_id(owner: &str, name: &str) -> String {
        format!("fs-{owner}-{name}")
    }

    fn filesystem_dir(&self, filesystem_id: &str) -> Result<PathBuf, FsError> {
        if !is_single_component(filesystem_id) {
            return Err(FsError::InvalidPath(filesystem_id.to_string()));
        }
        Ok(self.root.join(filesystem_id))
    }
}

/// True for a plain file name: no separators, no `.` or `..`
fn is_single_component(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl FilesystemResolver for LocalFilesystems {
    async fn resolve(
        &self,
        caller: &Caller,
        owner: Option<&str>,
        name: &str,
    ) -> Result<String, FsError> {
        let owner = match owner.filter(|o| !o.is_empty()) {
            Some(owner) if caller.is_root() => owner,
            Some(owner) => {
                return Err(FsError::AccessDenied(format!(
                    "only root can use filesystems of other users, user[{}] asked for user[{}]",
                    caller.name(),
                    owner
                )));
            }
            None => caller.name(),
        };

        let id = Self::filesystem_id(owner, name);
        let dir = self.filesystem_dir(&id)?;

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(id),
            Ok(_) => Err(FsError::NotFound(id)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FsError::NotFound(id)),
            Err(e) => Err(FsError::Io(e)),
        }
    }
}

#[async_trait]
impl FileReader for LocalFilesystems {
    async fn read_file(&self, filesystem_id: &str, path: &str) -> Result<Vec<u8>, FsError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(FsError::InvalidPath(path.to_string()));
        }

        let full = self.filesystem_dir(filesystem_id)?.join(relative);
        tracing::debug!("Reading {} from filesystem {}", path, filesystem_id);

        Ok(tokio::fs::read(full).await?)
    }
}
