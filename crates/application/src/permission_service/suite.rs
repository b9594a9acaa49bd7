use fieldgate_core::{AppResult, PermissionId};
use fieldgate_domain::{AccessLevel, Audience, Operation, PermissableField};
use tracing::{debug, error, info};

use crate::{NewPermission, PermissionRecord, SuiteInsertOutcome};

use super::PermissionService;

impl PermissionService {
    /// Inserts the full permission suite of an entity type, then relaxes audiences.
    ///
    /// Rows that already exist, including ones written by a concurrently booting
    /// instance, are skipped without error. Field rows for fields no longer in
    /// the descriptor are removed together with their grants.
    pub async fn create_permission_suite(&self, entity_type: &str) -> AppResult<SuiteInsertOutcome> {
        let fields = self.entities.permissable_fields(entity_type)?;
        let candidates = suite_candidates(entity_type, &fields);
        let candidate_count = candidates.len();

        let outcome = self
            .within_deadline(
                "permission suite insert",
                self.catalog.insert_permissions(candidates),
            )
            .await?;

        if outcome.skipped > 0 {
            debug!(
                entity_type,
                skipped = outcome.skipped,
                "permission suite rows already initialized"
            );
        }

        let current_fields = fields
            .iter()
            .map(|field| field.name().to_owned())
            .collect::<Vec<_>>();
        let pruned = self
            .within_deadline(
                "stale permission removal",
                self.catalog
                    .delete_stale_fields(entity_type, &current_fields),
            )
            .await?;

        if pruned > 0 {
            info!(entity_type, pruned, "stale permission rows removed");
        }

        let widened = self.update_permission_suite(entity_type).await?;

        info!(
            entity_type,
            fields = fields.len(),
            candidates = candidate_count,
            inserted = outcome.inserted,
            pruned,
            widened,
            "permission suite ready"
        );

        Ok(outcome)
    }

    /// Widens rows to `Everyone` wherever field metadata marks them public.
    ///
    /// Never narrows. Returns the number of rows that changed, which is zero
    /// when run again with unchanged metadata.
    pub async fn update_permission_suite(&self, entity_type: &str) -> AppResult<u64> {
        let fields = self.entities.permissable_fields(entity_type)?;
        let mut widened = 0;

        for access_level in AccessLevel::field_levels() {
            let public_fields = fields
                .iter()
                .filter(|field| field.is_public(*access_level))
                .map(|field| field.name().to_owned())
                .collect::<Vec<_>>();

            if public_fields.is_empty() {
                continue;
            }

            let operation = Operation::new(*access_level, entity_type)?;
            widened += self
                .within_deadline(
                    "permission audience relaxation",
                    self.catalog
                        .update_audience(&operation, &public_fields, Audience::Everyone),
                )
                .await?;
        }

        Ok(widened)
    }

    /// Creates the suite of every registered entity type, stopping at the first failure.
    pub async fn create_permission_suites(&self) -> AppResult<()> {
        for entity_type in self.entities.entity_types() {
            if let Err(error) = self.create_permission_suite(entity_type).await {
                error!(entity_type, %error, "failed to create permission suite");
                return Err(error);
            }
        }

        Ok(())
    }

    /// Removes every row of a retired entity type; role grants on them cascade.
    pub async fn delete_permission_suite(&self, entity_type: &str) -> AppResult<u64> {
        let removed = self
            .within_deadline(
                "permission suite delete",
                self.catalog.delete_permissions(entity_type),
            )
            .await?;

        info!(entity_type, removed, "permission suite deleted");
        Ok(removed)
    }

    /// Lists the catalog rows of an entity type.
    pub async fn list_permissions(&self, entity_type: &str) -> AppResult<Vec<PermissionRecord>> {
        self.within_deadline(
            "permission listing",
            self.catalog.list_permissions(entity_type),
        )
        .await
    }
}

/// Builds `3F + 3` rows: one per field for each field level, one per type level.
fn suite_candidates(entity_type: &str, fields: &[PermissableField]) -> Vec<NewPermission> {
    let mut candidates = Vec::with_capacity(
        fields.len() * AccessLevel::field_levels().len() + AccessLevel::type_levels().len(),
    );

    for access_level in AccessLevel::field_levels() {
        candidates.extend(fields.iter().map(|field| NewPermission {
            id: PermissionId::new(),
            access_level: *access_level,
            entity_type: entity_type.to_owned(),
            field: Some(field.name().to_owned()),
            audience: Audience::Authenticated,
        }));
    }

    candidates.extend(
        AccessLevel::type_levels()
            .iter()
            .map(|access_level| NewPermission {
                id: PermissionId::new(),
                access_level: *access_level,
                entity_type: entity_type.to_owned(),
                field: None,
                audience: Audience::Authenticated,
            }),
    );

    candidates
}
