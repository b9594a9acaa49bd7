use super::*;

impl PostgresPermissionRepository {
    /// Counts the operation's rows and aggregates the visible ones in one round trip,
    /// so an unmodeled operation is distinguishable from an empty grant.
    pub(super) async fn resolve_operation_impl(
        &self,
        operation: &Operation,
        role_ids: &[RoleId],
    ) -> AppResult<OperationResolution> {
        let row = sqlx::query_as::<_, OperationResolutionRow>(
            r#"
            SELECT
                COUNT(*) AS catalog_rows,
                COALESCE(
                    array_agg(DISTINCT scoped.field)
                        FILTER (WHERE scoped.visible AND scoped.field IS NOT NULL),
                    ARRAY[]::text[]
                ) AS visible_fields,
                COALESCE(bool_or(scoped.visible), false) AS type_level_visible
            FROM (
                SELECT
                    permission.field,
                    permission.audience = 'everyone'
                        OR EXISTS (
                            SELECT 1
                            FROM role_permission
                            WHERE role_permission.permission_id = permission.id
                              AND role_permission.role_id = ANY($3::uuid[])
                        ) AS visible
                FROM permission
                WHERE permission.access_level = $1
                  AND permission.type = $2
            ) AS scoped
            "#,
        )
        .bind(operation.access_level().as_str())
        .bind(operation.entity_type())
        .bind(role_uuids(role_ids))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to resolve '{operation}': {error}"))
        })?;

        Ok(OperationResolution {
            catalog_rows: u64::try_from(row.catalog_rows).unwrap_or_default(),
            visible_fields: row.visible_fields.into_iter().collect(),
            type_level_visible: row.type_level_visible,
        })
    }
}
