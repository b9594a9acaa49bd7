//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod descriptor;
mod operation;
mod policy;
mod registry;
mod role;

pub use access::{AccessLevel, Audience};
pub use descriptor::{EntityDescriptor, FieldDescriptor, PermissableField, extract_fields};
pub use operation::{Operation, QueryPermission};
pub use policy::{PermissionPolicy, PolicyRule, SUPPORTED_POLICY_VERSION};
pub use registry::EntityRegistry;
pub use role::RoleName;
