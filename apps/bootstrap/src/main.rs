//! Fieldgate permission catalog bootstrapper.

#![forbid(unsafe_code)]

mod bootstrap_config;
mod database;
mod entity_descriptors;
mod permission_bootstrap;
mod permission_policy;

use std::sync::Arc;

use fieldgate_core::AppError;
use fieldgate_infrastructure::PostgresPermissionRepository;
use tracing::info;

use crate::bootstrap_config::{BootstrapConfig, Command, init_tracing};
use crate::database::connect_and_migrate;
use crate::entity_descriptors::load_entity_registry;
use crate::permission_bootstrap::bootstrap_permissions;
use crate::permission_policy::load_permission_policy;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = BootstrapConfig::load()?;

    let pool = connect_and_migrate(&config.database_url, config.database_max_connections).await?;
    if config.command == Command::Migrate {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let entities = load_entity_registry(config.entity_descriptors_path.as_deref())?;
    let policy = load_permission_policy(config.permission_policy_path.as_deref())?;
    let repository = Arc::new(PostgresPermissionRepository::new(pool));

    let service =
        bootstrap_permissions(repository, entities, &policy, config.service_config()).await?;

    if let Command::Resolve { operation, roles } = &config.command {
        let permission = service.get_query_permission(operation, roles).await?;
        let rendered = serde_json::to_string_pretty(&permission).map_err(|error| {
            AppError::Internal(format!("failed to render query permission: {error}"))
        })?;
        println!("{rendered}");
    }

    Ok(())
}
