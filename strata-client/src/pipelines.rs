//! Pipeline-related API endpoints

use strata_core::dto::pipeline::{
    CreatePipeline, CreatePipelineResponse, GetPipelineQuery, GetPipelineResponse,
    GetPipelineVersionResponse, ListPipelinesQuery, ListPipelinesResponse, UpdatePipeline,
    UpdatePipelineResponse,
};
use uuid::Uuid;

use crate::StrataClient;
use crate::error::Result;

impl StrataClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Create a new pipeline from inline YAML or a filesystem path
    pub async fn create_pipeline(&self, req: &CreatePipeline) -> Result<CreatePipelineResponse> {
        let response = self.post("/api/pipeline").json(req).send().await?;

        self.handle_response(response).await
    }

    /// Add a new version to a pipeline
    pub async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        req: &UpdatePipeline,
    ) -> Result<UpdatePipelineResponse> {
        let response = self
            .post(&format!("/api/pipeline/{}", pipeline_id))
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List one page of pipelines
    ///
    /// Pass the previous page's `next_marker` as `query.marker` to continue.
    pub async fn list_pipelines(&self, query: &ListPipelinesQuery) -> Result<ListPipelinesResponse> {
        let response = self.get("/api/pipeline").query(query).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline with one page of its versions
    pub async fn get_pipeline(
        &self,
        pipeline_id: Uuid,
        query: &GetPipelineQuery,
    ) -> Result<GetPipelineResponse> {
        let response = self
            .get(&format!("/api/pipeline/{}", pipeline_id))
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_pipeline_version(
        &self,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<GetPipelineVersionResponse> {
        let response = self
            .get(&format!("/api/pipeline/{}/{}", pipeline_id, version_id))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a pipeline and all of its versions
    pub async fn delete_pipeline(&self, pipeline_id: Uuid) -> Result<()> {
        let response = self
            .delete(&format!("/api/pipeline/{}", pipeline_id))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Delete one version; the last version of a pipeline cannot be deleted
    pub async fn delete_pipeline_version(&self, pipeline_id: Uuid, version_id: Uuid) -> Result<()> {
        let response = self
            .delete(&format!("/api/pipeline/{}/{}", pipeline_id, version_id))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
