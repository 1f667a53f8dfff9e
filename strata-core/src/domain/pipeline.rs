//! Pipeline domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline definition
///
/// The aggregate root: owns every [`PipelineVersion`] created for it.
/// `name` is unique per `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store-assigned, strictly increasing. Only used to order and page rows.
    #[serde(skip)]
    pub row_key: i64,
}

/// Immutable snapshot of a pipeline's source and where it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub filesystem_id: Option<String>,
    pub filesystem_name: Option<String>,
    pub source_path: Option<String>,
    pub content: String,
    /// Hex SHA-256 of `content`
    pub content_hash: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub row_key: i64,
}
