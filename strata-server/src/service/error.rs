//! Service error type
//!
//! Every failure carries a machine-readable kind and a message meant for the
//! caller. Store failures other than "not found" and "duplicate" end up as
//! `Internal`.

use strata_core::dto::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    MalformedDefinition(String),

    #[error("{0}")]
    DuplicatedName(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidMarker(String),

    #[error("{0}")]
    ActionNotAllowed(String),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PipelineError::MalformedDefinition(_) => ErrorKind::MalformedDefinition,
            PipelineError::DuplicatedName(_) => ErrorKind::DuplicatedName,
            PipelineError::AccessDenied(_) => ErrorKind::AccessDenied,
            PipelineError::NotFound(_) => ErrorKind::NotFound,
            PipelineError::InvalidMarker(_) => ErrorKind::InvalidMarker,
            PipelineError::ActionNotAllowed(_) => ErrorKind::ActionNotAllowed,
            PipelineError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
