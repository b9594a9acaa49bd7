use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use fieldgate_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::AccessLevel;

/// Lookup key used at resolution time: what kind of action, on what kind of thing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Operation {
    access_level: AccessLevel,
    entity_type: NonEmptyString,
}

impl Operation {
    /// Creates an operation with a validated entity type name.
    pub fn new(access_level: AccessLevel, entity_type: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            access_level,
            entity_type: NonEmptyString::new(entity_type)?,
        })
    }

    /// Returns the access level.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns the governed entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }
}

impl Display for Operation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} {}", self.access_level, self.entity_type)
    }
}

/// Fields a specific caller may use for a specific operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPermission {
    operation: Operation,
    fields: BTreeSet<String>,
    permitted: bool,
}

impl QueryPermission {
    /// Builds a resolved permission from the catalog rows visible to a caller.
    ///
    /// `type_level_visible` only matters for field-less operations, where the
    /// single type-level row decides the outcome.
    #[must_use]
    pub fn resolved(
        operation: Operation,
        fields: BTreeSet<String>,
        type_level_visible: bool,
    ) -> Self {
        let permitted = if operation.access_level().is_field_level() {
            !fields.is_empty()
        } else {
            type_level_visible
        };

        Self {
            operation,
            fields,
            permitted,
        }
    }

    /// Returns the resolved operation.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Returns the field names the caller may use.
    #[must_use]
    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    /// Returns whether the caller may use the named field.
    #[must_use]
    pub fn allows_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Returns whether the caller may perform the operation at all.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }
}
