use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fieldgate_core::{AppError, AppResult, RoleId};
use fieldgate_domain::{
    AccessLevel, Audience, EntityDescriptor, EntityRegistry, FieldDescriptor, Operation,
    PermissionPolicy, RoleName,
};
use tokio::sync::Mutex;

use crate::{
    GrantOutcome, NewPermission, OperationResolution, PermissionCatalogRepository,
    PermissionRecord, RoleDirectory, RoleGrantRepository, RoleRecord, SuiteInsertOutcome,
};

use super::{PermissionService, PermissionServiceConfig};

#[derive(Default)]
struct FakeCatalogRepository {
    inserted: Mutex<Vec<NewPermission>>,
    stale_deletions: Mutex<Vec<(String, Vec<String>)>>,
    audience_updates: Mutex<Vec<(Operation, Vec<String>, Audience)>>,
    resolution: OperationResolution,
    fail_inserts: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl PermissionCatalogRepository for FakeCatalogRepository {
    async fn insert_permissions(
        &self,
        permissions: Vec<NewPermission>,
    ) -> AppResult<SuiteInsertOutcome> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_inserts {
            return Err(AppError::Storage("connection refused".to_owned()));
        }

        let inserted = u64::try_from(permissions.len()).unwrap_or(u64::MAX);
        self.inserted.lock().await.extend(permissions);
        Ok(SuiteInsertOutcome {
            inserted,
            skipped: 0,
        })
    }

    async fn update_audience(
        &self,
        operation: &Operation,
        fields: &[String],
        audience: Audience,
    ) -> AppResult<u64> {
        self.audience_updates
            .lock()
            .await
            .push((operation.clone(), fields.to_vec(), audience));
        Ok(u64::try_from(fields.len()).unwrap_or(u64::MAX))
    }

    async fn resolve_operation(
        &self,
        _operation: &Operation,
        _role_ids: &[RoleId],
    ) -> AppResult<OperationResolution> {
        Ok(self.resolution.clone())
    }

    async fn delete_stale_fields(&self, entity_type: &str, fields: &[String]) -> AppResult<u64> {
        self.stale_deletions
            .lock()
            .await
            .push((entity_type.to_owned(), fields.to_vec()));
        Ok(0)
    }

    async fn list_permissions(&self, _entity_type: &str) -> AppResult<Vec<PermissionRecord>> {
        Ok(Vec::new())
    }

    async fn delete_permissions(&self, _entity_type: &str) -> AppResult<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct FakeRoleGrantRepository {
    grants: Mutex<Vec<(Operation, Vec<String>, Vec<RoleId>)>>,
}

#[async_trait]
impl RoleGrantRepository for FakeRoleGrantRepository {
    async fn ensure_roles(&self, roles: &[RoleName]) -> AppResult<Vec<RoleRecord>> {
        Ok(roles
            .iter()
            .map(|name| RoleRecord {
                id: RoleId::new(),
                name: *name,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect())
    }

    async fn connect_role_permissions(
        &self,
        operation: &Operation,
        fields: &[String],
        role_ids: &[RoleId],
    ) -> AppResult<GrantOutcome> {
        self.grants
            .lock()
            .await
            .push((operation.clone(), fields.to_vec(), role_ids.to_vec()));
        Ok(GrantOutcome {
            linked: 1,
            already_present: 0,
        })
    }

    async fn revoke_role_permissions(
        &self,
        _operation: &Operation,
        _fields: &[String],
        _role_ids: &[RoleId],
    ) -> AppResult<u64> {
        Ok(0)
    }

    async fn list_role_permissions(&self, _role_id: RoleId) -> AppResult<Vec<PermissionRecord>> {
        Ok(Vec::new())
    }
}

fn registry() -> Arc<EntityRegistry> {
    let lesson = EntityDescriptor::new("Lesson")
        .unwrap_or_else(|_| unreachable!())
        .field(
            FieldDescriptor::new("title")
                .access([AccessLevel::Create, AccessLevel::Read, AccessLevel::Update])
                .public([AccessLevel::Read]),
        )
        .field(FieldDescriptor::new("course_id").access([AccessLevel::Create, AccessLevel::Read]))
        .field(FieldDescriptor::new("internal_notes"));

    Arc::new(EntityRegistry::new([lesson]).unwrap_or_default())
}

async fn service_with(
    catalog: Arc<FakeCatalogRepository>,
    role_grants: Arc<FakeRoleGrantRepository>,
    config: PermissionServiceConfig,
) -> PermissionService {
    let roles = RoleDirectory::load(role_grants.as_ref(), RoleName::all())
        .await
        .unwrap_or_default();

    PermissionService::new(catalog, role_grants, registry(), roles, config)
}

fn operation(access_level: AccessLevel) -> Operation {
    Operation::new(access_level, "Lesson").unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn create_permission_suite_builds_three_rows_per_field_plus_type_rows() {
    let catalog = Arc::new(FakeCatalogRepository::default());
    let service = service_with(
        catalog.clone(),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let outcome = service.create_permission_suite("Lesson").await;
    assert!(outcome.is_ok());

    let inserted = catalog.inserted.lock().await;
    assert_eq!(inserted.len(), 3 * 2 + 3);
    assert!(
        inserted
            .iter()
            .all(|row| row.audience == Audience::Authenticated)
    );
    assert_eq!(inserted.iter().filter(|row| row.field.is_none()).count(), 3);
    assert!(
        inserted
            .iter()
            .filter(|row| row.field.is_none())
            .all(|row| !row.access_level.is_field_level())
    );
    assert!(
        !inserted
            .iter()
            .any(|row| row.field.as_deref() == Some("internal_notes"))
    );
}

#[tokio::test]
async fn create_permission_suite_relaxes_public_fields() {
    let catalog = Arc::new(FakeCatalogRepository::default());
    let service = service_with(
        catalog.clone(),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let outcome = service.create_permission_suite("Lesson").await;
    assert!(outcome.is_ok());

    let updates = catalog.audience_updates.lock().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, operation(AccessLevel::Read));
    assert_eq!(updates[0].1, vec!["title".to_owned()]);
    assert_eq!(updates[0].2, Audience::Everyone);
}

#[tokio::test]
async fn storage_failure_aborts_suite_before_relaxation() {
    let catalog = Arc::new(FakeCatalogRepository {
        fail_inserts: true,
        ..FakeCatalogRepository::default()
    });
    let service = service_with(
        catalog.clone(),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service.create_permission_suites().await;
    assert!(matches!(result, Err(AppError::Storage(_))));
    assert!(catalog.audience_updates.lock().await.is_empty());
}

#[tokio::test]
async fn unregistered_entity_type_is_not_found() {
    let service = service_with(
        Arc::new(FakeCatalogRepository::default()),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service.create_permission_suite("Invoice").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn zero_catalog_rows_is_unmodeled_operation() {
    let service = service_with(
        Arc::new(FakeCatalogRepository::default()),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service
        .get_query_permission(&operation(AccessLevel::Read), &[RoleName::Admin])
        .await;
    assert!(matches!(result, Err(AppError::UnmodeledOperation(_))));
}

#[tokio::test]
async fn rows_without_matching_grant_resolve_to_empty_set() {
    let catalog = Arc::new(FakeCatalogRepository {
        resolution: OperationResolution {
            catalog_rows: 2,
            visible_fields: BTreeSet::new(),
            type_level_visible: false,
        },
        ..FakeCatalogRepository::default()
    });
    let service = service_with(
        catalog,
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let resolved = service
        .get_query_permission(&operation(AccessLevel::Update), &[RoleName::Member])
        .await;
    assert!(resolved.is_ok());

    let resolved = resolved.unwrap_or_else(|_| unreachable!());
    assert!(resolved.fields().is_empty());
    assert!(!resolved.is_permitted());
}

#[tokio::test]
async fn grant_rejects_structurally_disallowed_level() {
    let role_grants = Arc::new(FakeRoleGrantRepository::default());
    let service = service_with(
        Arc::new(FakeCatalogRepository::default()),
        role_grants.clone(),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service
        .connect_role_permissions(
            &operation(AccessLevel::Update),
            &["course_id".to_owned()],
            &[RoleName::Admin],
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(role_grants.grants.lock().await.is_empty());
}

#[tokio::test]
async fn grant_rejects_fields_on_field_less_operation() {
    let service = service_with(
        Arc::new(FakeCatalogRepository::default()),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service
        .connect_role_permissions(
            &operation(AccessLevel::Delete),
            &["title".to_owned()],
            &[RoleName::Admin],
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn grant_deduplicates_fields_and_roles() {
    let role_grants = Arc::new(FakeRoleGrantRepository::default());
    let service = service_with(
        Arc::new(FakeCatalogRepository::default()),
        role_grants.clone(),
        PermissionServiceConfig::default(),
    )
    .await;

    let result = service
        .connect_role_permissions(
            &operation(AccessLevel::Read),
            &["title".to_owned(), "title".to_owned()],
            &[RoleName::Admin, RoleName::Admin],
        )
        .await;
    assert!(result.is_ok());

    let grants = role_grants.grants.lock().await;
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].1.len(), 1);
    assert_eq!(grants[0].2.len(), 1);
}

#[tokio::test]
async fn slow_store_call_exceeds_deadline() {
    let catalog = Arc::new(FakeCatalogRepository {
        delay: Some(Duration::from_millis(500)),
        ..FakeCatalogRepository::default()
    });
    let service = service_with(
        catalog,
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig {
            store_timeout: Duration::from_millis(10),
        },
    )
    .await;

    let result = service.create_permission_suite("Lesson").await;
    assert!(matches!(result, Err(AppError::Storage(_))));
}

#[tokio::test]
async fn role_scoped_policy_narrows_then_grants() {
    let catalog = Arc::new(FakeCatalogRepository::default());
    let role_grants = Arc::new(FakeRoleGrantRepository::default());
    let service = service_with(
        catalog.clone(),
        role_grants.clone(),
        PermissionServiceConfig::default(),
    )
    .await;

    let policy = PermissionPolicy::from_json(
        r#"{
            "version": 1,
            "rules": [
                { "visibility": "public", "access_level": "read", "entity_type": "Lesson", "fields": ["course_id"] },
                { "visibility": "role_scoped", "access_level": "update", "entity_type": "Lesson", "fields": ["title"], "roles": ["ADMIN", "MEMBER"] }
            ]
        }"#,
    )
    .unwrap_or_else(|_| unreachable!());

    let applied = service.apply_policy(&policy).await;
    assert!(applied.is_ok());
    let applied = applied.unwrap_or_default();
    assert_eq!(applied.rules, 2);
    assert_eq!(applied.grants_linked, 1);

    let updates = catalog.audience_updates.lock().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].2, Audience::Everyone);
    assert_eq!(updates[1].1, vec!["title".to_owned()]);
    assert_eq!(updates[1].2, Audience::Authenticated);

    let grants = role_grants.grants.lock().await;
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].2.len(), 2);
}

#[tokio::test]
async fn role_scoped_policy_rejects_metadata_public_fields() {
    let catalog = Arc::new(FakeCatalogRepository::default());
    let role_grants = Arc::new(FakeRoleGrantRepository::default());
    let service = service_with(
        catalog.clone(),
        role_grants.clone(),
        PermissionServiceConfig::default(),
    )
    .await;

    let policy = PermissionPolicy::from_json(
        r#"{
            "version": 1,
            "rules": [
                { "visibility": "public", "access_level": "read", "entity_type": "Lesson", "fields": ["course_id"] },
                { "visibility": "role_scoped", "access_level": "read", "entity_type": "Lesson", "fields": ["title"], "roles": ["ADMIN"] }
            ]
        }"#,
    )
    .unwrap_or_else(|_| unreachable!());

    let applied = service.apply_policy(&policy).await;
    assert!(matches!(applied, Err(AppError::Validation(_))));
    assert!(catalog.audience_updates.lock().await.is_empty());
    assert!(role_grants.grants.lock().await.is_empty());
}

#[tokio::test]
async fn create_permission_suite_removes_rows_of_dropped_fields() {
    let catalog = Arc::new(FakeCatalogRepository::default());
    let service = service_with(
        catalog.clone(),
        Arc::new(FakeRoleGrantRepository::default()),
        PermissionServiceConfig::default(),
    )
    .await;

    assert!(service.create_permission_suite("Lesson").await.is_ok());

    let deletions = catalog.stale_deletions.lock().await;
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].0, "Lesson");
    assert_eq!(
        deletions[0].1.iter().map(String::as_str).collect::<BTreeSet<_>>(),
        BTreeSet::from(["course_id", "title"])
    );
}
