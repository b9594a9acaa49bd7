use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::{Audience, Operation, PermissionPolicy, PolicyRule};
use tracing::info;

use super::PermissionService;

/// Totals of one policy application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyApplication {
    /// Rules applied.
    pub rules: usize,
    /// Catalog rows whose audience changed.
    pub audience_rows_updated: u64,
    /// Role links newly written.
    pub grants_linked: u64,
}

impl PermissionService {
    /// Applies a static policy description on top of the generated suites.
    ///
    /// Public rules widen the listed fields to `Everyone`. Role-scoped rules
    /// narrow them to `Authenticated` and grant them to the listed roles.
    ///
    /// Role-scoped rules must not target rows that field metadata marks public;
    /// such a policy is rejected before any rule is applied.
    pub async fn apply_policy(&self, policy: &PermissionPolicy) -> AppResult<PolicyApplication> {
        for rule in policy.rules() {
            if let PolicyRule::RoleScoped { fields, .. } = rule {
                self.check_role_scoped_fields(&rule.operation()?, fields)?;
            }
        }

        let mut application = PolicyApplication::default();

        for rule in policy.rules() {
            let operation = rule.operation()?;

            match rule {
                PolicyRule::Public { fields, .. } => {
                    application.audience_rows_updated += self
                        .update_permission_audience(&operation, Audience::Everyone, fields)
                        .await?;
                }
                PolicyRule::RoleScoped { fields, roles, .. } => {
                    application.audience_rows_updated += self
                        .update_permission_audience(&operation, Audience::Authenticated, fields)
                        .await?;
                    application.grants_linked += self
                        .connect_role_permissions(&operation, fields, roles)
                        .await?
                        .linked;
                }
            }

            application.rules += 1;
        }

        info!(
            rules = application.rules,
            audience_rows_updated = application.audience_rows_updated,
            grants_linked = application.grants_linked,
            "permission policy applied"
        );

        Ok(application)
    }

    fn check_role_scoped_fields(&self, operation: &Operation, fields: &[String]) -> AppResult<()> {
        let permissable = self.entities.permissable_fields(operation.entity_type())?;
        let access_level = operation.access_level();

        let public_field = fields.iter().find(|field| {
            permissable.iter().any(|metadata| {
                metadata.name() == field.as_str() && metadata.is_public(access_level)
            })
        });

        if let Some(field) = public_field {
            return Err(AppError::Validation(format!(
                "role-scoped policy rule for '{operation}' targets '{}.{field}', which field metadata marks public",
                operation.entity_type()
            )));
        }

        Ok(())
    }
}
