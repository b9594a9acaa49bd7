use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::EntityRegistry;

use crate::{PermissionCatalogRepository, RoleDirectory, RoleGrantRepository};

mod admin;
mod policy;
mod resolve;
mod suite;

#[cfg(test)]
mod tests;

pub use policy::PolicyApplication;

/// Tunables for [`PermissionService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionServiceConfig {
    /// Upper bound for any single store call.
    pub store_timeout: Duration,
}

impl Default for PermissionServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Application service owning the permission catalog lifecycle and runtime resolution.
///
/// Cloning is cheap; clones share the same repositories. No method takes a
/// lock, so resolution may run concurrently without bound.
#[derive(Clone)]
pub struct PermissionService {
    catalog: Arc<dyn PermissionCatalogRepository>,
    role_grants: Arc<dyn RoleGrantRepository>,
    entities: Arc<EntityRegistry>,
    roles: Arc<RoleDirectory>,
    config: PermissionServiceConfig,
}

impl PermissionService {
    /// Creates a new permission service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn PermissionCatalogRepository>,
        role_grants: Arc<dyn RoleGrantRepository>,
        entities: Arc<EntityRegistry>,
        roles: RoleDirectory,
        config: PermissionServiceConfig,
    ) -> Self {
        Self {
            catalog,
            role_grants,
            entities,
            roles: Arc::new(roles),
            config,
        }
    }

    /// Returns the entity types this service models.
    #[must_use]
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    async fn within_deadline<T>(
        &self,
        action: &str,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| {
                AppError::Storage(format!(
                    "{action} exceeded the store deadline of {}ms",
                    self.config.store_timeout.as_millis()
                ))
            })?
    }
}
