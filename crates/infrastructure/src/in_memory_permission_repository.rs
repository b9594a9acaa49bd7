use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use fieldgate_application::{
    GrantOutcome, NewPermission, OperationResolution, PermissionCatalogRepository,
    PermissionRecord, RoleGrantRepository, RoleRecord, SuiteInsertOutcome,
};
use fieldgate_core::{AppError, AppResult, PermissionId, RoleId};
use fieldgate_domain::{AccessLevel, Audience, Operation, RoleName};
use tokio::sync::RwLock;


type PermissionKey = (AccessLevel, String, Option<String>);

/// In-memory permission catalog and role-grant store.
///
/// Locks are always taken in the order permissions, roles, role links.
#[derive(Debug, Default)]
pub struct InMemoryPermissionRepository {
    permissions: RwLock<BTreeMap<PermissionKey, PermissionRecord>>,
    roles: RwLock<HashMap<RoleName, RoleRecord>>,
    role_permissions: RwLock<BTreeSet<(RoleId, PermissionId)>>,
}

impl InMemoryPermissionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Keys targeted by an operation: the named field rows, or the single type-level row.
fn operation_keys(operation: &Operation, fields: &[String]) -> Vec<PermissionKey> {
    let access_level = operation.access_level();
    let entity_type = operation.entity_type().to_owned();

    if fields.is_empty() {
        return vec![(access_level, entity_type, None)];
    }

    fields
        .iter()
        .map(|field| (access_level, entity_type.clone(), Some(field.clone())))
        .collect()
}

fn matches_operation(record: &PermissionRecord, operation: &Operation) -> bool {
    record.access_level == operation.access_level() && record.entity_type == operation.entity_type()
}

#[async_trait]
impl PermissionCatalogRepository for InMemoryPermissionRepository {
    async fn insert_permissions(
        &self,
        permissions: Vec<NewPermission>,
    ) -> AppResult<SuiteInsertOutcome> {
        let mut stored = self.permissions.write().await;
        let mut outcome = SuiteInsertOutcome::default();
        let now = Utc::now();

        for permission in permissions {
            let key = (
                permission.access_level,
                permission.entity_type.clone(),
                permission.field.clone(),
            );

            if stored.contains_key(&key) {
                outcome.skipped += 1;
                continue;
            }

            stored.insert(
                key,
                PermissionRecord {
                    id: permission.id,
                    access_level: permission.access_level,
                    entity_type: permission.entity_type,
                    field: permission.field,
                    audience: permission.audience,
                    created_at: now,
                    updated_at: now,
                },
            );
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    async fn update_audience(
        &self,
        operation: &Operation,
        fields: &[String],
        audience: Audience,
    ) -> AppResult<u64> {
        let mut stored = self.permissions.write().await;
        let mut updated = 0;

        for key in operation_keys(operation, fields) {
            if let Some(record) = stored.get_mut(&key)
                && record.audience != audience
            {
                record.audience = audience;
                record.updated_at = Utc::now();
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn resolve_operation(
        &self,
        operation: &Operation,
        role_ids: &[RoleId],
    ) -> AppResult<OperationResolution> {
        let stored = self.permissions.read().await;
        let links = self.role_permissions.read().await;
        let mut resolution = OperationResolution::default();

        for record in stored
            .values()
            .filter(|record| matches_operation(record, operation))
        {
            resolution.catalog_rows += 1;

            let visible = record.audience == Audience::Everyone
                || role_ids
                    .iter()
                    .any(|role_id| links.contains(&(*role_id, record.id)));
            if !visible {
                continue;
            }

            resolution.type_level_visible = true;
            if let Some(field) = &record.field {
                resolution.visible_fields.insert(field.clone());
            }
        }

        Ok(resolution)
    }

    async fn delete_stale_fields(&self, entity_type: &str, fields: &[String]) -> AppResult<u64> {
        let mut stored = self.permissions.write().await;
        let mut links = self.role_permissions.write().await;

        let stale_ids = stored
            .values()
            .filter(|record| record.entity_type == entity_type)
            .filter(|record| {
                record
                    .field
                    .as_ref()
                    .is_some_and(|field| !fields.contains(field))
            })
            .map(|record| record.id)
            .collect::<BTreeSet<_>>();

        stored.retain(|_, record| !stale_ids.contains(&record.id));
        links.retain(|(_, permission_id)| !stale_ids.contains(permission_id));

        Ok(stale_ids.len() as u64)
    }

    async fn list_permissions(&self, entity_type: &str) -> AppResult<Vec<PermissionRecord>> {
        let stored = self.permissions.read().await;

        Ok(stored
            .values()
            .filter(|record| record.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn delete_permissions(&self, entity_type: &str) -> AppResult<u64> {
        let mut stored = self.permissions.write().await;
        let mut links = self.role_permissions.write().await;

        let removed_ids = stored
            .values()
            .filter(|record| record.entity_type == entity_type)
            .map(|record| record.id)
            .collect::<BTreeSet<_>>();

        stored.retain(|_, record| record.entity_type != entity_type);
        links.retain(|(_, permission_id)| !removed_ids.contains(permission_id));

        Ok(removed_ids.len() as u64)
    }
}

#[async_trait]
impl RoleGrantRepository for InMemoryPermissionRepository {
    async fn ensure_roles(&self, roles: &[RoleName]) -> AppResult<Vec<RoleRecord>> {
        let mut stored = self.roles.write().await;
        let now = Utc::now();

        Ok(roles
            .iter()
            .map(|role| {
                stored
                    .entry(*role)
                    .or_insert_with(|| RoleRecord {
                        id: RoleId::new(),
                        name: *role,
                        created_at: now,
                        updated_at: now,
                    })
                    .clone()
            })
            .collect())
    }

    async fn connect_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<GrantOutcome> {
        let stored = self.permissions.read().await;
        let roles = self.roles.read().await;
        let mut links = self.role_permissions.write().await;

        let mut permission_ids = Vec::new();
        for key in operation_keys(operation, fields) {
            let Some(record) = stored.get(&key) else {
                return Err(AppError::NotFound(format!(
                    "permission row for '{operation}' field '{}' does not exist",
                    key.2.as_deref().unwrap_or("-")
                )));
            };
            permission_ids.push(record.id);
        }

        if let Some(role_id) = role_ids
            .iter()
            .find(|role_id| !roles.values().any(|role| role.id == **role_id))
        {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        let mut outcome = GrantOutcome::default();
        for role_id in role_ids {
            for permission_id in &permission_ids {
                if links.insert((*role_id, *permission_id)) {
                    outcome.linked += 1;
                } else {
                    outcome.already_present += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn revoke_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<u64> {
        let stored = self.permissions.read().await;
        let mut links = self.role_permissions.write().await;
        let mut removed = 0;

        for key in operation_keys(operation, fields) {
            let Some(record) = stored.get(&key) else {
                continue;
            };

            for role_id in role_ids {
                if links.remove(&(*role_id, record.id)) {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>> {
        let stored = self.permissions.read().await;
        let links = self.role_permissions.read().await;

        Ok(stored
            .values()
            .filter(|record| links.contains(&(role_id, record.id)))
            .cloned()
            .collect())
    }
}
