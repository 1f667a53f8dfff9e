//! Service Module
//!
//! Business logic layer for the registry.
//! Services orchestrate between repositories and external collaborators and
//! contain the domain rules (ownership, guards, pagination).

pub mod error;
pub mod guard;
pub mod permission;
pub mod pipeline;
pub mod source;

pub use error::{PipelineError, Result};
pub use permission::{Caller, PermissionGate};
pub use pipeline::{Limits, PipelineService};
pub use source::SourceResolver;
