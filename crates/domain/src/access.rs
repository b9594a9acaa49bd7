use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fieldgate_core::AppError;
use serde::{Deserialize, Serialize};

/// Kinds of action a permission row governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Setting a field while creating a record.
    Create,
    /// Reading a field.
    Read,
    /// Changing a field on an existing record.
    Update,
    /// Linking a record to another record.
    Connect,
    /// Unlinking a record from another record.
    Disconnect,
    /// Deleting a record.
    Delete,
}

impl AccessLevel {
    /// Returns a stable storage value for this access level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Delete => "delete",
        }
    }

    /// Returns all known access levels.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AccessLevel] = &[
            AccessLevel::Create,
            AccessLevel::Read,
            AccessLevel::Update,
            AccessLevel::Connect,
            AccessLevel::Disconnect,
            AccessLevel::Delete,
        ];

        ALL
    }

    /// Access levels that are granted per field.
    #[must_use]
    pub fn field_levels() -> &'static [Self] {
        const FIELD_LEVELS: &[AccessLevel] =
            &[AccessLevel::Create, AccessLevel::Read, AccessLevel::Update];

        FIELD_LEVELS
    }

    /// Access levels that are granted for the entity type as a whole.
    #[must_use]
    pub fn type_levels() -> &'static [Self] {
        const TYPE_LEVELS: &[AccessLevel] = &[
            AccessLevel::Connect,
            AccessLevel::Disconnect,
            AccessLevel::Delete,
        ];

        TYPE_LEVELS
    }

    /// Returns whether permission rows at this level carry a field name.
    #[must_use]
    pub fn is_field_level(&self) -> bool {
        matches!(self, Self::Create | Self::Read | Self::Update)
    }
}

impl Display for AccessLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown access level '{value}'"
            ))),
        }
    }
}

/// Visibility tier of a permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// No sign-in and no role required.
    Everyone,
    /// Caller must be signed in and hold a granted role.
    Authenticated,
}

impl Audience {
    /// Returns a stable storage value for this audience.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Authenticated => "authenticated",
        }
    }
}

impl Display for Audience {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "everyone" => Ok(Self::Everyone),
            "authenticated" => Ok(Self::Authenticated),
            _ => Err(AppError::Validation(format!("unknown audience '{value}'"))),
        }
    }
}
