//! Infrastructure adapters for the permission engine ports.

#![forbid(unsafe_code)]

mod in_memory_permission_repository;
mod postgres_permission_repository;

pub use in_memory_permission_repository::InMemoryPermissionRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
