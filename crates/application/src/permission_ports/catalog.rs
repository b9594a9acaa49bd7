use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldgate_core::{AppResult, PermissionId, RoleId};
use fieldgate_domain::{AccessLevel, Audience, Operation};

/// Candidate catalog row produced by the suite generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    /// Identifier assigned to the row if it is inserted.
    pub id: PermissionId,
    /// Governed access level.
    pub access_level: AccessLevel,
    /// Governed entity type.
    pub entity_type: String,
    /// Governed field; `None` for field-less access levels.
    pub field: Option<String>,
    /// Initial audience.
    pub audience: Audience,
}

/// Stored permission catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Governed access level.
    pub access_level: AccessLevel,
    /// Governed entity type.
    pub entity_type: String,
    /// Governed field; `None` for field-less access levels.
    pub field: Option<String>,
    /// Current audience.
    pub audience: Audience,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last audience change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Result of a conflict-tolerant bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteInsertOutcome {
    /// Rows written by this call.
    pub inserted: u64,
    /// Rows that already existed and were left untouched.
    pub skipped: u64,
}

/// Aggregated view of one operation's catalog rows for a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResolution {
    /// Number of catalog rows for the operation, regardless of caller.
    pub catalog_rows: u64,
    /// Distinct field names visible to the caller.
    pub visible_fields: BTreeSet<String>,
    /// Whether any row of the operation is visible to the caller.
    pub type_level_visible: bool,
}

/// Repository port for the permission catalog.
///
/// For field-less operations the `fields` arguments are empty and the single
/// type-level row is targeted.
#[async_trait]
pub trait PermissionCatalogRepository: Send + Sync {
    /// Inserts rows, silently skipping ones whose `(access_level, entity_type, field)` exists.
    async fn insert_permissions(
        &self,
        permissions: Vec<NewPermission>,
    ) -> AppResult<SuiteInsertOutcome>;

    /// Moves the named rows to `audience`, returning how many rows changed.
    async fn update_audience(
        &self,
        operation: &Operation,
        fields: &[String],
        audience: Audience,
    ) -> AppResult<u64>;

    /// Aggregates the rows of an operation visible to everyone or to any of `role_ids`.
    async fn resolve_operation(
        &self,
        operation: &Operation,
        role_ids: &[RoleId],
    ) -> AppResult<OperationResolution>;

    /// Deletes the field rows of an entity type whose field is not in `fields`.
    ///
    /// Type-level rows are kept. Role grants on deleted rows cascade.
    async fn delete_stale_fields(&self, entity_type: &str, fields: &[String]) -> AppResult<u64>;

    /// Lists every row of an entity type.
    async fn list_permissions(&self, entity_type: &str) -> AppResult<Vec<PermissionRecord>>;

    /// Deletes every row of an entity type. Role grants on those rows cascade.
    async fn delete_permissions(&self, entity_type: &str) -> AppResult<u64>;
}
