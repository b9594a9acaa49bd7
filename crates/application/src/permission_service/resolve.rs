use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::{Operation, QueryPermission, RoleName};

use super::PermissionService;

impl PermissionService {
    /// Resolves the fields a caller holding `roles` may use for `operation`.
    ///
    /// Pass no roles for anonymous callers. Fails with `UnmodeledOperation` when
    /// the catalog has no rows for the operation at all; a caller matching none
    /// of the rows receives an empty, successful result instead.
    pub async fn get_query_permission(
        &self,
        operation: &Operation,
        roles: &[RoleName],
    ) -> AppResult<QueryPermission> {
        let role_ids = self.roles.role_ids(roles)?;

        let resolution = self
            .within_deadline(
                "query permission resolution",
                self.catalog.resolve_operation(operation, &role_ids),
            )
            .await?;

        if resolution.catalog_rows == 0 {
            return Err(AppError::UnmodeledOperation(format!(
                "no permission rows exist for '{operation}'"
            )));
        }

        Ok(QueryPermission::resolved(
            operation.clone(),
            resolution.visible_fields,
            resolution.type_level_visible,
        ))
    }
}
