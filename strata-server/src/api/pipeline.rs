//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{Json, extract::State, http::StatusCode};
use strata_core::dto::pipeline::{
    CreatePipeline, CreatePipelineResponse, GetPipelineQuery, GetPipelineResponse,
    GetPipelineVersionResponse, ListPipelinesQuery, ListPipelinesResponse, UpdatePipeline,
    UpdatePipelineResponse, split_filter,
};
use uuid::Uuid;

use super::AppState;
use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::service::Caller;

/// POST /api/pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<CreatePipelineResponse>)> {
    tracing::debug!("Creating pipeline for {}", caller.name());

    let created = state.pipelines.create_pipeline(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/pipeline
/// List pipelines, optionally filtered by owner (root only) and name
pub async fn list_pipelines(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<ListPipelinesQuery>,
) -> ApiResult<Json<ListPipelinesResponse>> {
    let page = state
        .pipelines
        .list_pipelines(
            &caller,
            query.marker.as_deref(),
            query.max_keys,
            split_filter(query.user_filter.as_deref()),
            split_filter(query.name_filter.as_deref()),
        )
        .await?;

    Ok(Json(page))
}

/// GET /api/pipeline/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<GetPipelineQuery>,
) -> ApiResult<Json<GetPipelineResponse>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = state
        .pipelines
        .get_pipeline(
            &caller,
            id,
            query.marker.as_deref(),
            query.max_keys,
            split_filter(query.fs_filter.as_deref()),
        )
        .await?;

    Ok(Json(pipeline))
}

/// POST /api/pipeline/{id}
/// Add a new version
pub async fn update_pipeline(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePipeline>,
) -> ApiResult<Json<UpdatePipelineResponse>> {
    let updated = state.pipelines.update_pipeline(&caller, id, req).await?;
    Ok(Json(updated))
}

/// DELETE /api/pipeline/{id}
pub async fn delete_pipeline(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.pipelines.delete_pipeline(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/pipeline/{id}/{version_id}
pub async fn get_pipeline_version(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((id, version_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<GetPipelineVersionResponse>> {
    tracing::debug!("Getting pipeline version: {}/{}", id, version_id);

    let version = state
        .pipelines
        .get_pipeline_version(&caller, id, version_id)
        .await?;

    Ok(Json(version))
}

/// DELETE /api/pipeline/{id}/{version_id}
pub async fn delete_pipeline_version(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((id, version_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .pipelines
        .delete_pipeline_version(&caller, id, version_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
