//! Application services and ports.

#![forbid(unsafe_code)]

mod permission_ports;
mod permission_service;
mod role_directory;

pub use permission_ports::{
    GrantOutcome, NewPermission, OperationResolution, PermissionCatalogRepository,
    PermissionRecord, RoleGrantRepository, RoleRecord, SuiteInsertOutcome,
};
pub use permission_service::{PermissionService, PermissionServiceConfig, PolicyApplication};
pub use role_directory::RoleDirectory;
