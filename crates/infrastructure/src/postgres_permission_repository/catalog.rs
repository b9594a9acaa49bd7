use super::*;

impl PostgresPermissionRepository {
    pub(super) async fn insert_permissions_impl(
        &self,
        permissions: Vec<NewPermission>,
    ) -> AppResult<SuiteInsertOutcome> {
        let candidates = permissions.len() as u64;
        if candidates == 0 {
            return Ok(SuiteInsertOutcome::default());
        }

        let mut ids = Vec::with_capacity(permissions.len());
        let mut access_levels = Vec::with_capacity(permissions.len());
        let mut entity_types = Vec::with_capacity(permissions.len());
        let mut fields = Vec::with_capacity(permissions.len());
        let mut audiences = Vec::with_capacity(permissions.len());

        for permission in permissions {
            ids.push(permission.id.as_uuid());
            access_levels.push(permission.access_level.as_str().to_owned());
            entity_types.push(permission.entity_type);
            fields.push(permission.field);
            audiences.push(permission.audience.as_str().to_owned());
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO permission (id, access_level, type, field, audience)
            SELECT *
            FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::text[], $5::text[])
            ON CONFLICT ON CONSTRAINT permission_operation_field_key DO NOTHING
            "#,
        )
        .bind(ids)
        .bind(access_levels)
        .bind(entity_types)
        .bind(fields)
        .bind(audiences)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to insert permission suite: {error}"))
        })?
        .rows_affected();

        Ok(SuiteInsertOutcome {
            inserted,
            skipped: candidates.saturating_sub(inserted),
        })
    }

    pub(super) async fn update_audience_impl(
        &self,
        operation: &Operation,
        fields: &[String],
        audience: Audience,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE permission
            SET audience = $1, updated_at = now()
            WHERE access_level = $2
              AND type = $3
              AND CASE
                    WHEN cardinality($4::text[]) = 0 THEN field IS NULL
                    ELSE field = ANY($4::text[])
                  END
              AND audience <> $1
            "#,
        )
        .bind(audience.as_str())
        .bind(operation.access_level().as_str())
        .bind(operation.entity_type())
        .bind(fields)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to update audience for '{operation}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }

    pub(super) async fn delete_stale_fields_impl(
        &self,
        entity_type: &str,
        fields: &[String],
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM permission
            WHERE type = $1
              AND field IS NOT NULL
              AND NOT (field = ANY($2::text[]))
            "#,
        )
        .bind(entity_type)
        .bind(fields)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to delete stale permissions for '{entity_type}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }

    pub(super) async fn list_permissions_impl(
        &self,
        entity_type: &str,
    ) -> AppResult<Vec<PermissionRecord>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                id,
                access_level,
                type AS entity_type,
                field,
                audience,
                created_at,
                updated_at
            FROM permission
            WHERE type = $1
            ORDER BY access_level, field NULLS FIRST
            "#,
        )
        .bind(entity_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to list permissions for '{entity_type}': {error}"
            ))
        })?;

        rows.into_iter().map(PermissionRow::into_record).collect()
    }

    pub(super) async fn delete_permissions_impl(&self, entity_type: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM permission
            WHERE type = $1
            "#,
        )
        .bind(entity_type)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!(
                "failed to delete permissions for '{entity_type}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }
}
