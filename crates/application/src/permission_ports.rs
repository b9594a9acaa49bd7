mod catalog;
mod role_grants;

pub use catalog::{
    NewPermission, OperationResolution, PermissionCatalogRepository, PermissionRecord,
    SuiteInsertOutcome,
};
pub use role_grants::{GrantOutcome, RoleGrantRepository, RoleRecord};
