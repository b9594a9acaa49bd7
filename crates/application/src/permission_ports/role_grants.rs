use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldgate_core::{AppResult, RoleId};
use fieldgate_domain::{Operation, RoleName};

use super::PermissionRecord;

/// Stored role record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: RoleName,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Result of an idempotent grant insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantOutcome {
    /// Links written by this call.
    pub linked: u64,
    /// Links that already existed.
    pub already_present: u64,
}

/// Repository port for roles and role-permission links.
#[async_trait]
pub trait RoleGrantRepository: Send + Sync {
    /// Upserts role records by name and returns them.
    async fn ensure_roles(&self, roles: &[RoleName]) -> AppResult<Vec<RoleRecord>>;

    /// Links every `(operation, field)` row to every role.
    ///
    /// Fails with `NotFound` when a named row does not exist; existing links are kept.
    async fn connect_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<GrantOutcome>;

    /// Removes the links between the named rows and roles, returning how many were removed.
    async fn revoke_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<u64>;

    /// Lists every permission row linked to a role.
    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>>;
}
