//! Pipeline Service
//!
//! Business logic for pipeline management: creating and versioning
//! definitions, paging through them, and deleting them behind the guards.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use strata_core::dto::pipeline::{
    CreatePipeline, CreatePipelineResponse, GetPipelineResponse, GetPipelineVersionResponse,
    ListPipelinesResponse, Page, PipelineSummary, PipelineVersionSummary, UpdatePipeline,
    UpdatePipelineResponse,
};
use uuid::Uuid;

use super::error::{PipelineError, Result};
use super::guard;
use super::permission::{self, Caller};
use super::source::{PipelineSource, SourceResolver};
use crate::collaborators::{ValidationContext, WorkflowValidator};
use crate::marker::MarkerCodec;
use crate::repository::{
    DefinitionStore, NewPipeline, NewPipelineVersion, PipelineFilter, ScheduleLookup, StoreError,
};

/// Request limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest accepted description, in bytes
    pub max_desc_length: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_desc_length: 1024,
            default_page_size: 50,
            max_page_size: 1000,
        }
    }
}

pub struct PipelineService {
    store: Arc<dyn DefinitionStore>,
    schedules: Arc<dyn ScheduleLookup>,
    sources: SourceResolver,
    validator: Arc<dyn WorkflowValidator>,
    markers: MarkerCodec,
    limits: Limits,
}

/// A validated version ready to be stored, with the name its YAML declares
struct PreparedVersion {
    name: String,
    version: NewPipelineVersion,
}

impl PipelineService {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        schedules: Arc<dyn ScheduleLookup>,
        sources: SourceResolver,
        validator: Arc<dyn WorkflowValidator>,
        markers: MarkerCodec,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            schedules,
            sources,
            validator,
            markers,
            limits,
        }
    }

    /// Create a pipeline together with its first version
    pub async fn create_pipeline(
        &self,
        caller: &Caller,
        req: CreatePipeline,
    ) -> Result<CreatePipelineResponse> {
        self.check_description(&req.description)?;
        let prepared = self.prepare_version(caller, &req).await?;

        let existing = self
            .store
            .find_pipeline_by_name(&prepared.name, caller.name())
            .await
            .map_err(|e| store_error(format!("get pipeline {}", prepared.name), e))?;
        if existing.is_some() {
            return Err(duplicated(&prepared.name, caller.name()));
        }

        let new = NewPipeline {
            name: prepared.name.clone(),
            description: req.description,
            owner: caller.name().to_string(),
        };
        let (pipeline, version) = self
            .store
            .create_pipeline(new, prepared.version)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => duplicated(&prepared.name, caller.name()),
                e => store_error(format!("create pipeline {}", prepared.name), e),
            })?;

        tracing::info!(
            "Pipeline created: {} ({}) by {}",
            pipeline.name,
            pipeline.id,
            caller.name()
        );

        Ok(CreatePipelineResponse {
            pipeline_id: pipeline.id,
            pipeline_version_id: version.id,
            name: pipeline.name,
        })
    }

    /// Add a new version to an existing pipeline
    ///
    /// The YAML must keep the pipeline's name; earlier versions are untouched.
    pub async fn update_pipeline(
        &self,
        caller: &Caller,
        pipeline_id: Uuid,
        req: UpdatePipeline,
    ) -> Result<UpdatePipelineResponse> {
        self.check_description(&req.description)?;
        let prepared = self.prepare_version(caller, &req).await?;

        let pipeline = permission::check_pipeline(self.store.as_ref(), caller, pipeline_id).await?;
        if pipeline.name != prepared.name {
            return Err(PipelineError::InvalidArgument(format!(
                "pipeline name cannot be changed from {} to {}",
                pipeline.name, prepared.name
            )));
        }

        let (pipeline, version) = self
            .store
            .update_pipeline(pipeline_id, &req.description, prepared.version)
            .await
            .map_err(|e| store_error(format!("update pipeline[{pipeline_id}]"), e))?;

        tracing::info!(
            "Pipeline updated: {} ({}), new version {}",
            pipeline.name,
            pipeline.id,
            version.id
        );

        Ok(UpdatePipelineResponse {
            pipeline_id: pipeline.id,
            pipeline_version_id: version.id,
        })
    }

    /// List pipelines visible to the caller
    ///
    /// Only root may filter by owner; everyone else always sees just their own
    /// pipelines.
    pub async fn list_pipelines(
        &self,
        caller: &Caller,
        marker: Option<&str>,
        max_keys: Option<usize>,
        owner_filter: Vec<String>,
        name_filter: Vec<String>,
    ) -> Result<ListPipelinesResponse> {
        let limit = self.page_size(max_keys)?;
        let after = self.decode_marker(marker)?;

        let owners = if caller.is_root() {
            owner_filter
        } else if owner_filter.is_empty() {
            vec![caller.name().to_string()]
        } else {
            return Err(PipelineError::InvalidArgument(format!(
                "user[{}] cannot filter pipelines by owner",
                caller.name()
            )));
        };
        let filter = PipelineFilter {
            owners,
            names: name_filter,
        };

        let rows = self
            .store
            .list_pipelines(after, limit, &filter)
            .await
            .map_err(|e| store_error("list pipelines".to_string(), e))?;

        let next_marker = match rows.last() {
            Some(last) => {
                let is_last = self
                    .store
                    .is_last_pipeline_key(last.row_key, &filter)
                    .await
                    .map_err(|e| store_error("list pipelines".to_string(), e))?;
                (!is_last).then(|| self.markers.encode(last.row_key))
            }
            None => None,
        };

        tracing::debug!("Listed {} pipelines for {}", rows.len(), caller.name());

        Ok(page(
            rows.into_iter().map(PipelineSummary::from).collect(),
            next_marker,
            limit,
        ))
    }

    /// Get a pipeline with one page of its versions
    pub async fn get_pipeline(
        &self,
        caller: &Caller,
        pipeline_id: Uuid,
        marker: Option<&str>,
        max_keys: Option<usize>,
        fs_filter: Vec<String>,
    ) -> Result<GetPipelineResponse> {
        let pipeline = permission::check_pipeline(self.store.as_ref(), caller, pipeline_id).await?;

        let limit = self.page_size(max_keys)?;
        let after = self.decode_marker(marker)?;

        let context = format!("list versions of pipeline[{pipeline_id}]");
        let rows = self
            .store
            .list_pipeline_versions(pipeline_id, after, limit, &fs_filter)
            .await
            .map_err(|e| store_error(context.clone(), e))?;

        let next_marker = match rows.last() {
            Some(last) => {
                let is_last = self
                    .store
                    .is_last_pipeline_version_key(pipeline_id, last.row_key, &fs_filter)
                    .await
                    .map_err(|e| store_error(context.clone(), e))?;
                (!is_last).then(|| self.markers.encode(last.row_key))
            }
            None => None,
        };

        tracing::debug!(
            "Fetched pipeline {} with {} versions",
            pipeline_id,
            rows.len()
        );

        Ok(GetPipelineResponse {
            pipeline: pipeline.into(),
            versions: page(
                rows.into_iter().map(PipelineVersionSummary::from).collect(),
                next_marker,
                limit,
            ),
        })
    }

    pub async fn get_pipeline_version(
        &self,
        caller: &Caller,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<GetPipelineVersionResponse> {
        let (pipeline, version) =
            permission::check_pipeline_version(self.store.as_ref(), caller, pipeline_id, version_id)
                .await?;

        Ok(GetPipelineVersionResponse {
            pipeline: pipeline.into(),
            version: version.into(),
        })
    }

    /// Delete a pipeline and every version of it
    pub async fn delete_pipeline(&self, caller: &Caller, pipeline_id: Uuid) -> Result<()> {
        permission::check_pipeline(self.store.as_ref(), caller, pipeline_id).await?;
        guard::ensure_pipeline_deletable(self.schedules.as_ref(), pipeline_id).await?;

        self.store
            .delete_pipeline(pipeline_id)
            .await
            .map_err(|e| store_error(format!("delete pipeline[{pipeline_id}]"), e))?;

        tracing::info!("Pipeline deleted: {} by {}", pipeline_id, caller.name());
        Ok(())
    }

    pub async fn delete_pipeline_version(
        &self,
        caller: &Caller,
        pipeline_id: Uuid,
        version_id: Uuid,
    ) -> Result<()> {
        permission::check_pipeline_version(self.store.as_ref(), caller, pipeline_id, version_id)
            .await?;
        guard::ensure_version_deletable(
            self.store.as_ref(),
            self.schedules.as_ref(),
            pipeline_id,
            version_id,
        )
        .await?;

        self.store
            .delete_pipeline_version(pipeline_id, version_id)
            .await
            .map_err(|e| {
                store_error(
                    format!("delete pipeline[{pipeline_id}] version[{version_id}]"),
                    e,
                )
            })?;

        tracing::info!(
            "Pipeline version deleted: {}/{} by {}",
            pipeline_id,
            version_id,
            caller.name()
        );
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_description(&self, description: &str) -> Result<()> {
        if description.len() > self.limits.max_desc_length {
            return Err(PipelineError::InvalidArgument(format!(
                "description is too long ({} bytes, max {})",
                description.len(),
                self.limits.max_desc_length
            )));
        }
        Ok(())
    }

    /// Resolve the request's source, validate it and build the version row
    async fn prepare_version(&self, caller: &Caller, req: &CreatePipeline) -> Result<PreparedVersion> {
        let fs_owner = req.username.as_deref().filter(|u| !u.is_empty());

        let source = PipelineSource::from_request(req)?;
        let resolved = self.sources.resolve(caller, source, fs_owner).await?;

        let content = String::from_utf8(resolved.content).map_err(|e| {
            PipelineError::MalformedDefinition(format!("pipeline yaml is not valid utf-8: {e}"))
        })?;

        let ctx = ValidationContext { caller, fs_owner };
        let name = self
            .validator
            .validate(&content, &ctx)
            .await
            .map_err(|e| PipelineError::MalformedDefinition(format!("invalid pipeline: {e}")))?;

        let (filesystem_id, filesystem_name) = match resolved.filesystem {
            Some(fs) => (Some(fs.id), Some(fs.name)),
            None => (None, None),
        };

        Ok(PreparedVersion {
            name,
            version: NewPipelineVersion {
                filesystem_id,
                filesystem_name,
                source_path: resolved.source_path,
                content_hash: content_hash(&content),
                content,
                owner: caller.name().to_string(),
            },
        })
    }

    fn page_size(&self, max_keys: Option<usize>) -> Result<usize> {
        let size = max_keys.unwrap_or(self.limits.default_page_size);
        if size == 0 || size > self.limits.max_page_size {
            return Err(PipelineError::InvalidArgument(format!(
                "maxKeys must be between 1 and {}, got {}",
                self.limits.max_page_size, size
            )));
        }
        Ok(size)
    }

    /// An absent or empty marker starts from the first row
    fn decode_marker(&self, marker: Option<&str>) -> Result<Option<i64>> {
        match marker.filter(|m| !m.is_empty()) {
            Some(marker) => self
                .markers
                .decode(marker)
                .map(Some)
                .map_err(|e| PipelineError::InvalidMarker(format!("invalid marker: {e}"))),
            None => Ok(None),
        }
    }
}

fn page<T>(items: Vec<T>, next_marker: Option<String>, max_keys: usize) -> Page<T> {
    Page {
        items,
        is_truncated: next_marker.is_some(),
        next_marker,
        max_keys,
    }
}

fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn duplicated(name: &str, owner: &str) -> PipelineError {
    PipelineError::DuplicatedName(format!(
        "pipeline {name} already exists for user[{owner}]"
    ))
}

fn store_error(action: String, err: StoreError) -> PipelineError {
    match err {
        StoreError::NotFound => PipelineError::NotFound(format!("{action} failed: not found")),
        StoreError::Duplicate => {
            PipelineError::DuplicatedName(format!("{action} failed: already exists"))
        }
        StoreError::Database(e) => {
            tracing::error!("{} failed: {}", action, e);
            PipelineError::Internal(format!("{action} failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{LocalFilesystems, YamlWorkflowValidator};
    use crate::repository::{InMemoryDefinitionStore, InMemoryScheduleLookup};
    use crate::service::PermissionGate;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use strata_core::domain::schedule::{Schedule, ScheduleStatus};

    struct Harness {
        dir: tempfile::TempDir,
        gate: PermissionGate,
        schedules: Arc<InMemoryScheduleLookup>,
        service: PipelineService,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let filesystems = Arc::new(LocalFilesystems::new(dir.path()));
            let schedules = Arc::new(InMemoryScheduleLookup::new());

            let service = PipelineService::new(
                Arc::new(InMemoryDefinitionStore::new()),
                schedules.clone(),
                SourceResolver::new(filesystems.clone(), filesystems.clone()),
                Arc::new(YamlWorkflowValidator::new(filesystems)),
                MarkerCodec::new("test-secret"),
                Limits::default(),
            );

            Self {
                dir,
                gate: PermissionGate::new(["root".to_string()]),
                schedules,
                service,
            }
        }

        fn caller(&self, name: &str) -> Caller {
            self.gate.identify(name)
        }

        fn write_file(&self, fs_id: &str, path: &str, content: &str) {
            let full = self.dir.path().join(fs_id).join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }

        async fn create(&self, user: &str, name: &str) -> CreatePipelineResponse {
            self.service
                .create_pipeline(&self.caller(user), inline(&workflow(name)))
                .await
                .unwrap()
        }

        async fn set_schedule(&self, pipeline_id: Uuid, version_id: Uuid, status: ScheduleStatus) {
            self.schedules
                .upsert(Schedule {
                    id: Uuid::from_u128(pipeline_id.as_u128() ^ version_id.as_u128()),
                    pipeline_id,
                    pipeline_version_id: version_id,
                    status,
                })
                .await;
        }
    }

    fn workflow(name: &str) -> String {
        format!("name: {name}\nentry_points:\n  main:\n    command: echo hello\n")
    }

    fn inline(yaml: &str) -> CreatePipeline {
        CreatePipeline {
            yaml_raw: Some(STANDARD.encode(yaml)),
            description: "x".to_string(),
            ..Default::default()
        }
    }

    fn from_fs(fs_name: &str, yaml_path: Option<&str>) -> CreatePipeline {
        CreatePipeline {
            fs_name: Some(fs_name.to_string()),
            yaml_path: yaml_path.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_reject_duplicate() {
        let h = Harness::new();
        let alice = h.caller("alice");

        let created = h
            .service
            .create_pipeline(&alice, inline(&workflow("demo")))
            .await
            .unwrap();
        assert_eq!(created.name, "demo");

        let again = h
            .service
            .create_pipeline(&alice, inline(&workflow("demo")))
            .await;
        assert!(matches!(again, Err(PipelineError::DuplicatedName(_))));

        // Names are only unique per owner
        let bob = h.create("bob", "demo").await;
        assert_ne!(bob.pipeline_id, created.pipeline_id);
    }

    #[tokio::test]
    async fn test_create_stores_version() {
        let h = Harness::new();
        let alice = h.caller("alice");
        let yaml = workflow("demo");

        let created = h.service.create_pipeline(&alice, inline(&yaml)).await.unwrap();
        let got = h
            .service
            .get_pipeline_version(&alice, created.pipeline_id, created.pipeline_version_id)
            .await
            .unwrap();

        assert_eq!(got.pipeline.name, "demo");
        assert_eq!(got.pipeline.description, "x");
        assert_eq!(got.version.pipeline_yaml, yaml);
        assert_eq!(got.version.content_hash, content_hash(&yaml));
        assert_eq!(got.version.content_hash.len(), 64);
        assert_eq!(got.version.fs_name, None);
        assert_eq!(got.version.yaml_path, None);
    }

    #[tokio::test]
    async fn test_create_from_filesystem() {
        let h = Harness::new();
        let alice = h.caller("alice");
        h.write_file("fs-alice-data", "run.yaml", &workflow("demo"));
        h.write_file("fs-alice-data", "flows/nightly.yaml", &workflow("nightly"));

        let created = h
            .service
            .create_pipeline(&alice, from_fs("data", None))
            .await
            .unwrap();
        let got = h
            .service
            .get_pipeline_version(&alice, created.pipeline_id, created.pipeline_version_id)
            .await
            .unwrap();
        assert_eq!(got.version.fs_name.as_deref(), Some("data"));
        assert_eq!(got.version.yaml_path.as_deref(), Some("./run.yaml"));

        let nightly = h
            .service
            .create_pipeline(&alice, from_fs("data", Some("flows/nightly.yaml")))
            .await
            .unwrap();
        assert_eq!(nightly.name, "nightly");
    }

    #[tokio::test]
    async fn test_create_source_errors() {
        let h = Harness::new();
        let alice = h.caller("alice");
        h.write_file("fs-alice-data", "run.yaml", &workflow("demo"));

        let mut both = inline(&workflow("demo"));
        both.yaml_path = Some("./run.yaml".to_string());
        assert!(matches!(
            h.service.create_pipeline(&alice, both).await,
            Err(PipelineError::InvalidArgument(_))
        ));

        let mut both = inline(&workflow("demo"));
        both.fs_name = Some("data".to_string());
        assert!(matches!(
            h.service.create_pipeline(&alice, both).await,
            Err(PipelineError::InvalidArgument(_))
        ));

        assert!(matches!(
            h.service
                .create_pipeline(&alice, CreatePipeline::default())
                .await,
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.service
                .create_pipeline(&alice, from_fs("data", Some("missing.yaml")))
                .await,
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.service
                .create_pipeline(&alice, from_fs("other", None))
                .await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_filesystem_owner_override() {
        let h = Harness::new();
        h.write_file("fs-alice-data", "run.yaml", &workflow("demo"));

        let mut req = from_fs("data", None);
        req.username = Some("alice".to_string());

        assert!(matches!(
            h.service.create_pipeline(&h.caller("bob"), req.clone()).await,
            Err(PipelineError::AccessDenied(_))
        ));

        let root = h.caller("root");
        let created = h.service.create_pipeline(&root, req).await.unwrap();
        let got = h
            .service
            .get_pipeline_version(&root, created.pipeline_id, created.pipeline_version_id)
            .await
            .unwrap();
        assert_eq!(got.pipeline.owner, "root");
        assert_eq!(got.version.fs_name.as_deref(), Some("data"));
    }

    #[tokio::test]
    async fn test_description_limit() {
        let h = Harness::new();
        let alice = h.caller("alice");

        let mut req = inline(&workflow("demo"));
        req.description = "d".repeat(1025);
        assert!(matches!(
            h.service.create_pipeline(&alice, req.clone()).await,
            Err(PipelineError::InvalidArgument(_))
        ));

        req.description = "d".repeat(1024);
        h.service.create_pipeline(&alice, req).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_definitions() {
        let h = Harness::new();
        let alice = h.caller("alice");

        let not_utf8 = CreatePipeline {
            yaml_raw: Some(STANDARD.encode([0xff, 0xfe, 0x00])),
            ..Default::default()
        };
        let cases = [
            inline("name: [unclosed"),
            inline("name: demo\n"),
            inline(&workflow("1bad")),
            not_utf8,
        ];

        for req in cases {
            assert!(matches!(
                h.service.create_pipeline(&alice, req).await,
                Err(PipelineError::MalformedDefinition(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_update_adds_version() {
        let h = Harness::new();
        let alice = h.caller("alice");
        let created = h.create("alice", "demo").await;

        let yaml = format!("{}  second:\n    command: echo again\n", workflow("demo"));
        let mut req = inline(&yaml);
        req.description = "second".to_string();

        let updated = h
            .service
            .update_pipeline(&alice, created.pipeline_id, req)
            .await
            .unwrap();
        assert_eq!(updated.pipeline_id, created.pipeline_id);
        assert_ne!(updated.pipeline_version_id, created.pipeline_version_id);

        let got = h
            .service
            .get_pipeline(&alice, created.pipeline_id, None, None, vec![])
            .await
            .unwrap();
        assert_eq!(got.pipeline.description, "second");
        assert_eq!(got.versions.items.len(), 2);

        // The first version is untouched
        let first = &got.versions.items[0];
        assert_eq!(first.id, created.pipeline_version_id);
        assert_eq!(first.pipeline_yaml, workflow("demo"));
        assert_eq!(got.versions.items[1].pipeline_yaml, yaml);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let h = Harness::new();
        let created = h.create("alice", "demo").await;

        assert!(matches!(
            h.service
                .update_pipeline(&h.caller("alice"), created.pipeline_id, inline(&workflow("renamed")))
                .await,
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.service
                .update_pipeline(&h.caller("bob"), created.pipeline_id, inline(&workflow("demo")))
                .await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .update_pipeline(&h.caller("alice"), Uuid::new_v4(), inline(&workflow("demo")))
                .await,
            Err(PipelineError::NotFound(_))
        ));

        h.service
            .update_pipeline(&h.caller("root"), created.pipeline_id, inline(&workflow("demo")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_pages_cover_everything() {
        let h = Harness::new();
        let mut expected = Vec::new();
        for i in 0..7 {
            let name = format!("alice_{i}");
            h.create("alice", &name).await;
            expected.push(name);
            if i % 3 == 0 {
                h.create("bob", &format!("bob_{i}")).await;
            }
        }
        let alice = h.caller("alice");

        for size in 1..=8 {
            let mut seen = Vec::new();
            let mut marker: Option<String> = None;
            let mut pages = 0;

            loop {
                let page = h
                    .service
                    .list_pipelines(&alice, marker.as_deref(), Some(size), vec![], vec![])
                    .await
                    .unwrap();
                pages += 1;
                assert_eq!(page.max_keys, size);
                assert_eq!(page.is_truncated, page.next_marker.is_some());
                seen.extend(page.items.into_iter().map(|p| p.name));

                match page.next_marker {
                    Some(next) => marker = Some(next),
                    None => break,
                }
            }

            assert_eq!(seen, expected, "page size {size}");
            assert_eq!(pages, expected.len().div_ceil(size), "page size {size}");
        }
    }

    #[tokio::test]
    async fn test_list_visibility() {
        let h = Harness::new();
        h.create("alice", "a1").await;
        h.create("alice", "a2").await;
        h.create("bob", "b1").await;

        let names = |page: ListPipelinesResponse| {
            page.items.into_iter().map(|p| p.name).collect::<Vec<_>>()
        };

        let bob = h.caller("bob");
        let page = h
            .service
            .list_pipelines(&bob, None, None, vec![], vec![])
            .await
            .unwrap();
        assert_eq!(names(page), ["b1"]);

        assert!(matches!(
            h.service
                .list_pipelines(&bob, None, None, vec!["alice".to_string()], vec![])
                .await,
            Err(PipelineError::InvalidArgument(_))
        ));

        let root = h.caller("root");
        let page = h
            .service
            .list_pipelines(&root, None, None, vec![], vec![])
            .await
            .unwrap();
        assert_eq!(page.max_keys, 50);
        assert!(!page.is_truncated);
        assert_eq!(names(page), ["a1", "a2", "b1"]);

        let page = h
            .service
            .list_pipelines(
                &root,
                None,
                None,
                vec!["alice".to_string()],
                vec!["a2".to_string(), "b1".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(names(page), ["a2"]);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_paging_arguments() {
        let h = Harness::new();
        let alice = h.caller("alice");
        h.create("alice", "a1").await;

        for size in [0, 1001] {
            assert!(matches!(
                h.service
                    .list_pipelines(&alice, None, Some(size), vec![], vec![])
                    .await,
                Err(PipelineError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            h.service
                .list_pipelines(&alice, Some("not-a-marker"), None, vec![], vec![])
                .await,
            Err(PipelineError::InvalidMarker(_))
        ));

        let other = MarkerCodec::new("other-secret").encode(0);
        assert!(matches!(
            h.service
                .list_pipelines(&alice, Some(&other), None, vec![], vec![])
                .await,
            Err(PipelineError::InvalidMarker(_))
        ));

        let page = h
            .service
            .list_pipelines(&alice, Some(""), Some(1000), vec![], vec![])
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_get_pipeline_pages_versions() {
        let h = Harness::new();
        let alice = h.caller("alice");
        h.write_file("fs-alice-data", "run.yaml", &workflow("demo"));

        let created = h.create("alice", "demo").await;
        for _ in 0..2 {
            h.service
                .update_pipeline(&alice, created.pipeline_id, from_fs("data", None))
                .await
                .unwrap();
        }

        let first = h
            .service
            .get_pipeline(&alice, created.pipeline_id, None, Some(2), vec![])
            .await
            .unwrap();
        assert_eq!(first.versions.items.len(), 2);
        assert!(first.versions.is_truncated);

        let second = h
            .service
            .get_pipeline(
                &alice,
                created.pipeline_id,
                first.versions.next_marker.as_deref(),
                Some(2),
                vec![],
            )
            .await
            .unwrap();
        assert_eq!(second.versions.items.len(), 1);
        assert!(!second.versions.is_truncated);
        assert_eq!(second.versions.next_marker, None);

        let on_data = h
            .service
            .get_pipeline(&alice, created.pipeline_id, None, None, vec!["data".to_string()])
            .await
            .unwrap();
        assert_eq!(on_data.versions.items.len(), 2);
        assert!(on_data
            .versions
            .items
            .iter()
            .all(|v| v.fs_name.as_deref() == Some("data")));

        assert!(matches!(
            h.service
                .get_pipeline(&h.caller("bob"), created.pipeline_id, None, None, vec![])
                .await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .get_pipeline(&alice, Uuid::new_v4(), None, None, vec![])
                .await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_pipeline_checks_owner_before_paging() {
        let h = Harness::new();
        let created = h.create("alice", "demo").await;
        let bob = h.caller("bob");

        assert!(matches!(
            h.service
                .get_pipeline(&bob, created.pipeline_id, Some("bogus"), None, vec![])
                .await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .get_pipeline(&bob, created.pipeline_id, None, Some(0), vec![])
                .await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .get_pipeline(&h.caller("alice"), created.pipeline_id, Some("bogus"), None, vec![])
                .await,
            Err(PipelineError::InvalidMarker(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let h = Harness::new();
        let alice = h.caller("alice");
        let created = h.create("alice", "demo").await;
        let (pid, v1) = (created.pipeline_id, created.pipeline_version_id);
        let v2 = h
            .service
            .update_pipeline(&alice, pid, inline(&workflow("demo")))
            .await
            .unwrap()
            .pipeline_version_id;

        h.set_schedule(pid, v1, ScheduleStatus::Running).await;

        assert!(matches!(
            h.service.delete_pipeline(&alice, pid).await,
            Err(PipelineError::ActionNotAllowed(_))
        ));
        assert!(matches!(
            h.service.delete_pipeline_version(&alice, pid, v1).await,
            Err(PipelineError::ActionNotAllowed(_))
        ));

        // v2 has no running schedule
        h.service.delete_pipeline_version(&alice, pid, v2).await.unwrap();

        h.set_schedule(pid, v1, ScheduleStatus::Success).await;

        // The last version only goes away with its pipeline
        assert!(matches!(
            h.service.delete_pipeline_version(&alice, pid, v1).await,
            Err(PipelineError::ActionNotAllowed(_))
        ));

        h.service.delete_pipeline(&alice, pid).await.unwrap();
        assert!(matches!(
            h.service.get_pipeline(&alice, pid, None, None, vec![]).await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            h.service.get_pipeline_version(&alice, pid, v1).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_access() {
        let h = Harness::new();
        let created = h.create("alice", "demo").await;
        let pid = created.pipeline_id;

        assert!(matches!(
            h.service.delete_pipeline(&h.caller("bob"), pid).await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .delete_pipeline_version(&h.caller("bob"), pid, created.pipeline_version_id)
                .await,
            Err(PipelineError::AccessDenied(_))
        ));
        assert!(matches!(
            h.service
                .delete_pipeline_version(&h.caller("alice"), pid, Uuid::new_v4())
                .await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            h.service
                .delete_pipeline(&h.caller("alice"), Uuid::new_v4())
                .await,
            Err(PipelineError::NotFound(_))
        ));

        h.service.delete_pipeline(&h.caller("root"), pid).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_one_pipeline() {
        let h = Harness::new();
        let alice = h.caller("alice");

        let (a, b) = tokio::join!(
            h.service.create_pipeline(&alice, inline(&workflow("demo"))),
            h.service.create_pipeline(&alice, inline(&workflow("demo"))),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(PipelineError::DuplicatedName(_)))));
    }
}
