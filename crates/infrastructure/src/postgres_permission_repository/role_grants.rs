use std::collections::BTreeSet;

use super::*;

impl PostgresPermissionRepository {
    pub(super) async fn ensure_roles_impl(&self, roles: &[RoleName]) -> AppResult<Vec<RoleRecord>> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Storage(format!("failed to begin transaction: {error}"))
            })?;

        let mut records = Vec::with_capacity(roles.len());
        for role in roles {
            let row = sqlx::query_as::<_, RoleRow>(
                r#"
                INSERT INTO role (id, name)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE
                SET name = EXCLUDED.name
                RETURNING id, name, created_at, updated_at
                "#,
            )
            .bind(RoleId::new().as_uuid())
            .bind(role.as_str())
            .fetch_one(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Storage(format!("failed to ensure role '{role}': {error}"))
            })?;

            records.push(row.into_record()?);
        }

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit transaction: {error}"))
        })?;

        Ok(records)
    }

    pub(super) async fn connect_role_permissions_impl(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<GrantOutcome> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Storage(format!("failed to begin transaction: {error}"))
            })?;

        let rows = sqlx::query_as::<_, (Uuid, Option<String>)>(
            r#"
            SELECT id, field
            FROM permission
            WHERE access_level = $1
              AND type = $2
              AND CASE
                    WHEN cardinality($3::text[]) = 0 THEN field IS NULL
                    ELSE field = ANY($3::text[])
                  END
            "#,
        )
        .bind(operation.access_level().as_str())
        .bind(operation.entity_type())
        .bind(fields)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to load permissions for '{operation}': {error}"
            ))
        })?;

        if fields.is_empty() {
            if rows.is_empty() {
                return Err(AppError::NotFound(format!(
                    "permission row for '{operation}' does not exist"
                )));
            }
        } else {
            let found = rows
                .iter()
                .filter_map(|(_, field)| field.as_deref())
                .collect::<BTreeSet<_>>();
            let missing = fields
                .iter()
                .filter(|field| !found.contains(field.as_str()))
                .cloned()
                .collect::<Vec<_>>();

            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "permission rows for '{operation}' fields [{}] do not exist",
                    missing.join(", ")
                )));
            }
        }

        let permission_ids = rows.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        let requested = (permission_ids.len() * role_ids.len()) as u64;

        let result = sqlx::query(
            r#"
            INSERT INTO role_permission (role_id, permission_id)
            SELECT roles.role_id, permissions.permission_id
            FROM UNNEST($1::uuid[]) AS roles(role_id)
            CROSS JOIN UNNEST($2::uuid[]) AS permissions(permission_id)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_uuids(role_ids))
        .bind(permission_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!(
                    "a role granted '{operation}' does not exist"
                ));
            }

            AppError::Storage(format!(
                "failed to connect role permissions for '{operation}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit transaction: {error}"))
        })?;

        let linked = result.rows_affected();
        Ok(GrantOutcome {
            linked,
            already_present: requested.saturating_sub(linked),
        })
    }

    pub(super) async fn revoke_role_permissions_impl(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM role_permission
            USING permission
            WHERE role_permission.permission_id = permission.id
              AND permission.access_level = $1
              AND permission.type = $2
              AND CASE
                    WHEN cardinality($3::text[]) = 0 THEN permission.field IS NULL
                    ELSE permission.field = ANY($3::text[])
                  END
              AND role_permission.role_id = ANY($4::uuid[])
            "#,
        )
        .bind(operation.access_level().as_str())
        .bind(operation.entity_type())
        .bind(fields)
        .bind(role_uuids(role_ids))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to revoke role permissions for '{operation}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }

    pub(super) async fn list_role_permissions_impl(
        &self,
        role_id: RoleId,
    ) -> AppResult<Vec<PermissionRecord>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permission.id,
                permission.access_level,
                permission.type AS entity_type,
                permission.field,
                permission.audience,
                permission.created_at,
                permission.updated_at
            FROM permission
            JOIN role_permission
                ON role_permission.permission_id = permission.id
            WHERE role_permission.role_id = $1
            ORDER BY permission.type, permission.access_level, permission.field NULLS FIRST
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to list permissions of role '{role_id}': {error}"
            ))
        })?;

        rows.into_iter().map(PermissionRow::into_record).collect()
    }
}
