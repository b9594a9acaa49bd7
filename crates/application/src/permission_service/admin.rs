use std::collections::BTreeSet;

use fieldgate_core::{AppError, AppResult, RoleId};
use fieldgate_domain::{Audience, Operation, RoleName};
use tracing::{debug, info};

use crate::{GrantOutcome, PermissionRecord};

use super::PermissionService;

impl PermissionService {
    /// Moves the named fields of an operation to `audience`, widening or narrowing.
    ///
    /// Field-less operations take an empty `fields` list.
    pub async fn update_permission_audience(
        &self,
        operation: &Operation,
        audience: Audience,
        fields: &[String],
    ) -> AppResult<u64> {
        let fields = self.checked_fields(operation, fields)?;

        let updated = self
            .within_deadline(
                "permission audience update",
                self.catalog.update_audience(operation, &fields, audience),
            )
            .await?;

        info!(
            operation = %operation,
            audience = %audience,
            fields = fields.len(),
            updated,
            "permission audience updated"
        );

        Ok(updated)
    }

    /// Grants the named fields of an operation to every listed role.
    ///
    /// Granting an existing link again is not an error.
    pub async fn connect_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        roles: &[RoleName],
    ) -> AppResult<GrantOutcome> {
        let fields = self.checked_fields(operation, fields)?;
        let role_ids = self.checked_role_ids(operation, roles)?;

        let outcome = self
            .within_deadline(
                "role permission grant",
                self.role_grants
                    .connect_role_permissions(operation, &fields, &role_ids),
            )
            .await?;

        if outcome.already_present > 0 {
            debug!(
                operation = %operation,
                already_present = outcome.already_present,
                "role permission links already existed"
            );
        }

        info!(
            operation = %operation,
            roles = roles.len(),
            linked = outcome.linked,
            "role permissions connected"
        );

        Ok(outcome)
    }

    /// Removes grants of the named fields of an operation from every listed role.
    pub async fn revoke_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        roles: &[RoleName],
    ) -> AppResult<u64> {
        let fields = self.checked_fields(operation, fields)?;
        let role_ids = self.checked_role_ids(operation, roles)?;

        let removed = self
            .within_deadline(
                "role permission revocation",
                self.role_grants
                    .revoke_role_permissions(operation, &fields, &role_ids),
            )
            .await?;

        info!(operation = %operation, removed, "role permissions revoked");
        Ok(removed)
    }

    /// Lists the catalog rows granted to a role.
    pub async fn list_role_permissions(&self, role: RoleName) -> AppResult<Vec<PermissionRecord>> {
        let role_id = self.roles.role_id(role)?;

        self.within_deadline(
            "role permission listing",
            self.role_grants.list_role_permissions(role_id),
        )
        .await
    }

    /// Validates fields against the entity descriptor and returns them deduplicated.
    fn checked_fields(&self, operation: &Operation, fields: &[String]) -> AppResult<Vec<String>> {
        let permissable = self.entities.permissable_fields(operation.entity_type())?;
        let access_level = operation.access_level();

        if !access_level.is_field_level() {
            if !fields.is_empty() {
                return Err(AppError::Validation(format!(
                    "operation '{operation}' is field-less and does not take fields"
                )));
            }

            return Ok(Vec::new());
        }

        if fields.is_empty() {
            return Err(AppError::Validation(format!(
                "operation '{operation}' requires at least one field"
            )));
        }

        let mut checked = BTreeSet::new();
        for field in fields {
            let Some(metadata) = permissable.iter().find(|metadata| metadata.name() == field) else {
                return Err(AppError::Validation(format!(
                    "field '{}.{field}' is not permissable",
                    operation.entity_type()
                )));
            };

            if !metadata.allows(access_level) {
                return Err(AppError::Validation(format!(
                    "field '{}.{field}' does not allow '{access_level}' access",
                    operation.entity_type()
                )));
            }

            checked.insert(field.clone());
        }

        Ok(checked.into_iter().collect())
    }

    fn checked_role_ids(
        &self,
        operation: &Operation,
        roles: &[RoleName],
    ) -> AppResult<Vec<RoleId>> {
        if roles.is_empty() {
            return Err(AppError::Validation(format!(
                "role grant for '{operation}' requires at least one role"
            )));
        }

        self.roles.role_ids(roles)
    }
}
