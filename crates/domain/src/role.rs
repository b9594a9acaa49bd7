use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fieldgate_core::AppError;
use serde::{Deserialize, Serialize};

/// Closed set of role names callers may hold.
///
/// Role membership of a principal is owned by the identity layer; this engine
/// only consumes the names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleName {
    /// Platform administrator.
    #[serde(rename = "ADMIN")]
    Admin,
    /// Member of a course or organisation.
    #[serde(rename = "MEMBER")]
    Member,
    /// Any signed-in user.
    #[serde(rename = "USER")]
    User,
    /// The principal that owns the record being accessed.
    #[serde(rename = "SELF")]
    Owner,
}

impl RoleName {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
            Self::User => "USER",
            Self::Owner => "SELF",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[RoleName] = &[
            RoleName::Admin,
            RoleName::Member,
            RoleName::User,
            RoleName::Owner,
        ];

        ALL
    }

    /// Parses a list of role names, failing on the first unknown entry.
    pub fn parse_all<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Vec<Self>, AppError> {
        values.into_iter().map(Self::from_str).collect()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            "USER" => Ok(Self::User),
            "SELF" => Ok(Self::Owner),
            _ => Err(AppError::Validation(format!("unknown role name '{value}'"))),
        }
    }
}
