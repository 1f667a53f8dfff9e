//! Repository Module
//!
//! Data access layer for the registry.
//! Each repository is a trait with a PostgreSQL implementation and an
//! in-memory implementation used for local development and tests.

pub mod memory;
pub mod pipeline;
pub mod schedule;

use thiserror::Error;

// Re-export traits
pub use pipeline::{DefinitionStore, NewPipeline, NewPipelineVersion, PipelineFilter};
pub use schedule::ScheduleLookup;

// Re-export implementations
pub use memory::{InMemoryDefinitionStore, InMemoryScheduleLookup};
pub use pipeline::PgDefinitionStore;
pub use schedule::PgScheduleLookup;

/// Repository error type
///
/// Missing rows and uniqueness violations are kept apart from other database
/// failures so callers can map them to domain errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Classify an error raised by an INSERT
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err)
    }
}
