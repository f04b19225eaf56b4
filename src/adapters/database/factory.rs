//! Repository factory
//!
//! This module builds the tool registry and export job repository selected
//! by the configuration.

use crate::adapters::database::traits::{ExportJobRepository, ToolRegistryRepository};
use crate::adapters::memory::{InMemoryExportJobRepository, InMemoryToolRegistry};
use crate::adapters::postgresql::{
    PostgreSQLClient, PostgreSQLExportJobRepository, PostgreSQLToolRegistry,
};
use crate::config::schema::{DatabaseTarget, ToolpackConfig};
use crate::domain::{Result, ToolpackError};
use std::sync::Arc;

/// Repositories handed to the export orchestrator
pub type Repositories = (
    Arc<dyn ToolRegistryRepository>,
    Arc<dyn ExportJobRepository>,
);

/// Create both repositories based on the configuration
///
/// The job repository follows `database_target`. The tool registry comes
/// from `registry.tools_file` when one is configured, otherwise from the
/// same backend as the jobs.
///
/// # Errors
///
/// Returns an error if the tools file cannot be loaded, the PostgreSQL
/// section is missing, or the database cannot be reached.
pub async fn create_repositories(config: &ToolpackConfig) -> Result<Repositories> {
    let file_registry = match &config.registry.tools_file {
        Some(path) => {
            tracing::info!(tools_file = %path, "Loading tool registry from file");
            Some(Arc::new(InMemoryToolRegistry::from_json_file(path).await?)
                as Arc<dyn ToolRegistryRepository>)
        }
        None => None,
    };

    match config.database_target {
        DatabaseTarget::Memory => {
            tracing::info!("Using in-memory export job repository");
            let tools = file_registry.unwrap_or_else(|| {
                Arc::new(InMemoryToolRegistry::new()) as Arc<dyn ToolRegistryRepository>
            });
            let jobs: Arc<dyn ExportJobRepository> = Arc::new(InMemoryExportJobRepository::new());
            Ok((tools, jobs))
        }
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                ToolpackError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL repositories");
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);
            client.test_connection().await?;
            client.ensure_schema().await?;

            let tools = file_registry.unwrap_or_else(|| {
                Arc::new(PostgreSQLToolRegistry::new(client.clone()))
                    as Arc<dyn ToolRegistryRepository>
            });
            let jobs: Arc<dyn ExportJobRepository> =
                Arc::new(PostgreSQLExportJobRepository::new(client));
            Ok((tools, jobs))
        }
    }
}
