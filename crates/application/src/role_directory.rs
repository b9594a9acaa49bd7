use std::collections::HashMap;

use fieldgate_core::{AppError, AppResult, RoleId};
use fieldgate_domain::RoleName;

use crate::{RoleGrantRepository, RoleRecord};

/// Validated mapping from role names to stored role identifiers.
///
/// Built once at startup and handed to the services that need it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDirectory {
    ids: HashMap<RoleName, RoleId>,
}

impl RoleDirectory {
    /// Ensures the roles exist in the store and maps them.
    pub async fn load(repository: &dyn RoleGrantRepository, roles: &[RoleName]) -> AppResult<Self> {
        let records = repository.ensure_roles(roles).await?;
        let directory = Self::from_records(records);

        if let Some(missing) = roles.iter().find(|role| !directory.ids.contains_key(*role)) {
            return Err(AppError::Internal(format!(
                "role '{missing}' was not returned by the role store"
            )));
        }

        Ok(directory)
    }

    /// Builds a directory from stored role records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = RoleRecord>) -> Self {
        Self {
            ids: records
                .into_iter()
                .map(|record| (record.name, record.id))
                .collect(),
        }
    }

    /// Returns the stored identifier of a role.
    pub fn role_id(&self, role: RoleName) -> AppResult<RoleId> {
        self.ids
            .get(&role)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("role '{role}' is not registered")))
    }

    /// Returns the distinct stored identifiers of several roles.
    pub fn role_ids(&self, roles: &[RoleName]) -> AppResult<Vec<RoleId>> {
        let mut ids = roles
            .iter()
            .map(|role| self.role_id(*role))
            .collect::<AppResult<Vec<_>>>()?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
