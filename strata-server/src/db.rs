use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            pk BIGSERIAL UNIQUE,
            id UUID PRIMARY KEY,
            name VARCHAR(50) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            owner VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CONSTRAINT uq_pipelines_owner_name UNIQUE (owner, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pipeline versions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_versions (
            pk BIGSERIAL UNIQUE,
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            fs_id VARCHAR(255),
            fs_name VARCHAR(255),
            yaml_path TEXT,
            pipeline_yaml TEXT NOT NULL,
            pipeline_hash VARCHAR(64) NOT NULL,
            owner VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Schedules belong to the scheduler; created here so a fresh database
    // can answer the delete guards.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            pk BIGSERIAL UNIQUE,
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL,
            pipeline_version_id UUID NOT NULL,
            status VARCHAR(32) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_versions_pipeline_pk ON pipeline_versions(pipeline_id, pk)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipelines_owner_pk ON pipelines(owner, pk)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedules_pipeline_status ON schedules(pipeline_id, status)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
