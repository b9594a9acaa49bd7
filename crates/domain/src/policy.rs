use fieldgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{AccessLevel, Operation, RoleName};

/// Policy description format version understood by this crate.
pub const SUPPORTED_POLICY_VERSION: u32 = 1;

/// Human-authored description of product-level access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    version: u32,
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

impl PermissionPolicy {
    /// Parses and validates a JSON policy description.
    pub fn from_json(value: &str) -> AppResult<Self> {
        let policy = serde_json::from_str::<Self>(value)
            .map_err(|error| AppError::Validation(format!("invalid permission policy: {error}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Returns the policy rules in authoring order.
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    fn validate(&self) -> AppResult<()> {
        if self.version != SUPPORTED_POLICY_VERSION {
            return Err(AppError::Validation(format!(
                "permission policy version {} is not supported (expected {SUPPORTED_POLICY_VERSION})",
                self.version
            )));
        }

        for rule in &self.rules {
            let operation = rule.operation()?;
            let fields = rule.fields();

            match (operation.access_level().is_field_level(), fields.is_empty()) {
                (true, true) => {
                    return Err(AppError::Validation(format!(
                        "policy rule for '{operation}' must list at least one field"
                    )));
                }
                (false, false) => {
                    return Err(AppError::Validation(format!(
                        "policy rule for '{operation}' must not list fields"
                    )));
                }
                _ => {}
            }

            if matches!(rule, PolicyRule::RoleScoped { .. }) && rule.roles().is_empty() {
                return Err(AppError::Validation(format!(
                    "role-scoped policy rule for '{operation}' must list at least one role"
                )));
            }
        }

        Ok(())
    }
}

/// One operation entry of a policy description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum PolicyRule {
    /// Listed fields are open to everyone.
    Public {
        /// Governed access level.
        access_level: AccessLevel,
        /// Governed entity type.
        entity_type: String,
        /// Governed fields; empty for field-less access levels.
        #[serde(default)]
        fields: Vec<String>,
    },
    /// Listed fields require sign-in and one of the listed roles.
    RoleScoped {
        /// Governed access level.
        access_level: AccessLevel,
        /// Governed entity type.
        entity_type: String,
        /// Governed fields; empty for field-less access levels.
        #[serde(default)]
        fields: Vec<String>,
        /// Roles granted the fields.
        roles: Vec<RoleName>,
    },
}

impl PolicyRule {
    /// Returns the operation the rule governs.
    pub fn operation(&self) -> AppResult<Operation> {
        match self {
            Self::Public {
                access_level,
                entity_type,
                ..
            }
            | Self::RoleScoped {
                access_level,
                entity_type,
                ..
            } => Operation::new(*access_level, entity_type.as_str()),
        }
    }

    /// Returns the governed field names.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Public { fields, .. } | Self::RoleScoped { fields, .. } => fields,
        }
    }

    /// Returns the granted roles; empty for public rules.
    #[must_use]
    pub fn roles(&self) -> &[RoleName] {
        match self {
            Self::Public { .. } => &[],
            Self::RoleScoped { roles, .. } => roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PermissionPolicy, PolicyRule};
    use crate::{AccessLevel, RoleName};

    #[test]
    fn parses_public_and_role_scoped_rules() {
        let policy = PermissionPolicy::from_json(
            r#"{
                "version": 1,
                "rules": [
                    { "visibility": "public", "access_level": "read", "entity_type": "Course", "fields": ["name"] },
                    { "visibility": "role_scoped", "access_level": "delete", "entity_type": "Course", "roles": ["ADMIN"] }
                ]
            }"#,
        );
        assert!(policy.is_ok());

        let policy = policy.unwrap_or_else(|_| unreachable!());
        assert_eq!(policy.rules().len(), 2);
        assert!(matches!(policy.rules()[0], PolicyRule::Public { .. }));
        assert_eq!(policy.rules()[1].roles(), &[RoleName::Admin]);
        assert!(matches!(
            policy.rules()[1].operation().map(|operation| operation.access_level()),
            Ok(AccessLevel::Delete)
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let policy = PermissionPolicy::from_json(r#"{ "version": 2, "rules": [] }"#);
        assert!(policy.is_err());
    }

    #[test]
    fn field_level_rule_requires_fields() {
        let policy = PermissionPolicy::from_json(
            r#"{ "version": 1, "rules": [{ "visibility": "public", "access_level": "read", "entity_type": "Course" }] }"#,
        );
        assert!(policy.is_err());
    }

    #[test]
    fn type_level_rule_rejects_fields() {
        let policy = PermissionPolicy::from_json(
            r#"{ "version": 1, "rules": [{ "visibility": "public", "access_level": "connect", "entity_type": "Course", "fields": ["name"] }] }"#,
        );
        assert!(policy.is_err());
    }

    #[test]
    fn role_scoped_rule_requires_roles() {
        let policy = PermissionPolicy::from_json(
            r#"{ "version": 1, "rules": [{ "visibility": "role_scoped", "access_level": "read", "entity_type": "User", "fields": ["email"], "roles": [] }] }"#,
        );
        assert!(policy.is_err());
    }

    #[test]
    fn unknown_role_name_is_rejected() {
        let policy = PermissionPolicy::from_json(
            r#"{ "version": 1, "rules": [{ "visibility": "role_scoped", "access_level": "read", "entity_type": "User", "fields": ["email"], "roles": ["GUEST"] }] }"#,
        );
        assert!(policy.is_err());
    }
}
