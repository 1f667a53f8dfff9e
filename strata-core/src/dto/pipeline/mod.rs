//! Pipeline DTOs
//!
//! Requests carry the pipeline source in its wire form (optional fields);
//! the server turns them into a tagged source before doing any work.
//! Every body and query string uses camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pipeline::{Pipeline, PipelineVersion};

/// Request to create a new pipeline
///
/// Exactly one source must be given: `yamlRaw` (base64 encoded YAML), or
/// `fsName` with an optional `yamlPath` (defaults to `./run.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_raw: Option<String>,
    /// Owner of `fs_name` when it is not the caller. Root only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Request to add a new version to an existing pipeline
pub type UpdatePipeline = CreatePipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelineResponse {
    pub pipeline_id: Uuid,
    pub pipeline_version_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipelineResponse {
    pub pipeline_id: Uuid,
    pub pipeline_version_id: Uuid,
}

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pipeline> for PipelineSummary {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            id: pipeline.id,
            name: pipeline.name,
            description: pipeline.description,
            owner: pipeline.owner,
            created_at: pipeline.created_at,
            updated_at: pipeline.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineVersionSummary {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub fs_name: Option<String>,
    pub yaml_path: Option<String>,
    pub pipeline_yaml: String,
    pub content_hash: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PipelineVersion> for PipelineVersionSummary {
    fn from(version: PipelineVersion) -> Self {
        Self {
            id: version.id,
            pipeline_id: version.pipeline_id,
            fs_name: version.filesystem_name,
            yaml_path: version.source_path,
            pipeline_yaml: version.content,
            content_hash: version.content_hash,
            owner: version.owner,
            created_at: version.created_at,
            updated_at: version.updated_at,
        }
    }
}

/// One page of a marker-paginated listing
///
/// `next_marker` is present exactly when `is_truncated` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    pub is_truncated: bool,
    pub max_keys: usize,
}

pub type ListPipelinesResponse = Page<PipelineSummary>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineResponse {
    pub pipeline: PipelineSummary,
    pub versions: Page<PipelineVersionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineVersionResponse {
    pub pipeline: PipelineSummary,
    pub version: PipelineVersionSummary,
}

/// Query string of `GET /api/pipeline`
///
/// Filters are comma-separated lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPipelinesQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_keys: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_filter: Option<String>,
}

/// Query string of `GET /api/pipeline/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPipelineQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_keys: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_filter: Option<String>,
}

/// Splits a comma-separated filter, dropping blank entries
pub fn split_filter(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_conversion_drops_row_key() {
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: "demo".to_string(),
            description: "desc".to_string(),
            owner: "alice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            row_key: 42,
        };

        let summary: PipelineSummary = pipeline.clone().into();
        assert_eq!(summary.id, pipeline.id);
        assert_eq!(summary.name, pipeline.name);

        let json = serde_json::to_value(&pipeline).unwrap();
        assert!(json.get("row_key").is_none());
    }

    #[test]
    fn test_page_omits_missing_marker() {
        let page: Page<PipelineSummary> = Page {
            items: vec![],
            next_marker: None,
            is_truncated: false,
            max_keys: 50,
        };

        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("nextMarker").is_none());
        assert_eq!(json["maxKeys"], 50);
    }

    #[test]
    fn test_page_wire_format() {
        let page = Page {
            items: vec![1, 2],
            next_marker: Some("abc".to_string()),
            is_truncated: true,
            max_keys: 2,
        };

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::json!({
                "items": [1, 2],
                "nextMarker": "abc",
                "isTruncated": true,
                "maxKeys": 2,
            })
        );
    }

    #[test]
    fn test_create_request_wire_format() {
        let req: CreatePipeline = serde_json::from_str(
            r#"{"fsName": "data", "yamlPath": "flows/a.yaml", "username": "alice", "description": "x"}"#,
        )
        .unwrap();
        assert_eq!(req.fs_name.as_deref(), Some("data"));
        assert_eq!(req.yaml_path.as_deref(), Some("flows/a.yaml"));
        assert_eq!(req.username.as_deref(), Some("alice"));

        let inline = CreatePipeline {
            yaml_raw: Some("bmFtZTogZGVtbwo=".to_string()),
            description: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            serde_json::json!({ "yamlRaw": "bmFtZTogZGVtbwo=", "description": "x" })
        );

        // snake_case names are not part of the wire format
        let req: CreatePipeline = serde_json::from_str(r#"{"fs_name": "data"}"#).unwrap();
        assert!(req.fs_name.is_none());
    }

    #[test]
    fn test_response_wire_format() {
        let id = Uuid::new_v4();
        let created = CreatePipelineResponse {
            pipeline_id: id,
            pipeline_version_id: id,
            name: "demo".to_string(),
        };

        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["pipelineId"], id.to_string());
        assert_eq!(json["pipelineVersionId"], id.to_string());
        assert_eq!(json["name"], "demo");
    }

    #[test]
    fn test_create_request_accepts_partial_body() {
        let req: CreatePipeline = serde_json::from_str(r#"{"fsName": "data"}"#).unwrap();
        assert_eq!(req.fs_name.as_deref(), Some("data"));
        assert!(req.yaml_raw.is_none());
        assert_eq!(req.description, "");
    }

    #[test]
    fn test_split_filter() {
        assert_eq!(split_filter(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(split_filter(Some("")).is_empty());
        assert!(split_filter(None).is_empty());
    }
}
