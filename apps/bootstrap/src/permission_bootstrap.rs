use std::sync::Arc;

use fieldgate_application::{
    PermissionCatalogRepository, PermissionService, PermissionServiceConfig, RoleDirectory,
    RoleGrantRepository,
};
use fieldgate_core::AppError;
use fieldgate_domain::{EntityRegistry, PermissionPolicy, RoleName};
use tracing::info;

/// Seeds roles, creates every registered suite and applies the policy on top.
///
/// Any failure aborts startup; the catalog must be complete before serving.
pub async fn bootstrap_permissions<R>(
    repository: Arc<R>,
    entities: EntityRegistry,
    policy: &PermissionPolicy,
    config: PermissionServiceConfig,
) -> Result<PermissionService, AppError>
where
    R: PermissionCatalogRepository + RoleGrantRepository + 'static,
{
    let roles = RoleDirectory::load(repository.as_ref(), RoleName::all()).await?;
    info!(roles = RoleName::all().len(), "roles registered");

    let service = PermissionService::new(
        repository.clone(),
        repository,
        Arc::new(entities),
        roles,
        config,
    );

    service.create_permission_suites().await?;
    service.apply_policy(policy).await?;

    info!(
        entity_types = service.entities().len(),
        "permission catalog bootstrapped"
    );

    Ok(service)
}
