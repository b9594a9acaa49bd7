use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use fieldgate_application::{
    GrantOutcome, NewPermission, OperationResolution, PermissionCatalogRepository,
    PermissionRecord, RoleGrantRepository, RoleRecord, SuiteInsertOutcome,
};
use fieldgate_core::{AppError, AppResult, PermissionId, RoleId};
use fieldgate_domain::{AccessLevel, Audience, Operation, RoleName};

mod catalog;
mod resolve;
mod role_grants;


/// PostgreSQL-backed permission catalog and role-grant store.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    access_level: String,
    entity_type: String,
    field: Option<String>,
    audience: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_record(self) -> AppResult<PermissionRecord> {
        let access_level = AccessLevel::from_str(self.access_level.as_str()).map_err(|_| {
            AppError::Internal(format!(
                "permission '{}' has unknown access level '{}'",
                self.id, self.access_level
            ))
        })?;
        let audience = Audience::from_str(self.audience.as_str()).map_err(|_| {
            AppError::Internal(format!(
                "permission '{}' has unknown audience '{}'",
                self.id, self.audience
            ))
        })?;

        Ok(PermissionRecord {
            id: PermissionId::from_uuid(self.id),
            access_level,
            entity_type: self.entity_type,
            field: self.field,
            audience,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_record(self) -> AppResult<RoleRecord> {
        let name = RoleName::from_str(self.name.as_str()).map_err(|_| {
            AppError::Internal(format!("role '{}' has unknown name '{}'", self.id, self.name))
        })?;

        Ok(RoleRecord {
            id: RoleId::from_uuid(self.id),
            name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OperationResolutionRow {
    catalog_rows: i64,
    visible_fields: Vec<String>,
    type_level_visible: bool,
}

#[async_trait]
impl PermissionCatalogRepository for PostgresPermissionRepository {
    async fn insert_permissions(
        &self,
        permissions: Vec<NewPermission>,
    ) -> AppResult<SuiteInsertOutcome> {
        self.insert_permissions_impl(permissions).await
    }

    async fn update_audience(
        &self,
        operation: &Operation,
        fields: &[String],
        audience: Audience,
    ) -> AppResult<u64> {
        self.update_audience_impl(operation, fields, audience).await
    }

    async fn resolve_operation(
        &self,
        operation: &Operation,
        role_ids: &[RoleId],
    ) -> AppResult<OperationResolution> {
        self.resolve_operation_impl(operation, role_ids).await
    }

    async fn delete_stale_fields(&self, entity_type: &str, fields: &[String]) -> AppResult<u64> {
        self.delete_stale_fields_impl(entity_type, fields).await
    }

    async fn list_permissions(&self, entity_type: &str) -> AppResult<Vec<PermissionRecord>> {
        self.list_permissions_impl(entity_type).await
    }

    async fn delete_permissions(&self, entity_type: &str) -> AppResult<u64> {
        self.delete_permissions_impl(entity_type).await
    }
}

#[async_trait]
impl RoleGrantRepository for PostgresPermissionRepository {
    async fn ensure_roles(&self, roles: &[RoleName]) -> AppResult<Vec<RoleRecord>> {
        self.ensure_roles_impl(roles).await
    }

    async fn connect_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<GrantOutcome> {
        self.connect_role_permissions_impl(operation, fields, role_ids)
            .await
    }

    async fn revoke_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<u64> {
        self.revoke_role_permissions_impl(operation, fields, role_ids)
            .await
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>> {
        self.list_role_permissions_impl(role_id).await
    }
}

fn role_uuids(role_ids: &[RoleId]) -> Vec<Uuid> {
    role_ids.iter().map(RoleId::as_uuid).collect()
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23503")
    )
}
