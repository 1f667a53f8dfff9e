//! External collaborators
//!
//! Traits for the systems the registry consumes but does not own, plus the
//! default implementations wired up by `main`.

pub mod filesystem;
pub mod workflow;

pub use filesystem::{FileReader, FilesystemResolver, FsError, LocalFilesystems};
pub use workflow::{ValidationContext, ValidationError, WorkflowValidator, YamlWorkflowValidator};
