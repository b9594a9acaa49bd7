use std::collections::{BTreeSet, HashSet};

use fieldgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::AccessLevel;

/// Static access declaration for one field of an entity.
///
/// `access` lists the field-bearing levels the field takes part in; `public`
/// lists the subset whose rows should be widened to [`crate::Audience::Everyone`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    name: String,
    #[serde(default)]
    access: Vec<AccessLevel>,
    #[serde(default)]
    public: Vec<AccessLevel>,
}

impl FieldDescriptor {
    /// Starts a declaration for a field that takes part in nothing yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: Vec::new(),
            public: Vec::new(),
        }
    }

    /// Declares the access levels the field takes part in.
    #[must_use]
    pub fn access(mut self, levels: impl IntoIterator<Item = AccessLevel>) -> Self {
        self.access.extend(levels);
        self
    }

    /// Declares the access levels at which the field is publicly exposed or settable.
    #[must_use]
    pub fn public(mut self, levels: impl IntoIterator<Item = AccessLevel>) -> Self {
        self.public.extend(levels);
        self
    }

    /// Returns the declared field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Structural description of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDescriptor {
    entity_type: NonEmptyString,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Creates a descriptor without fields.
    pub fn new(entity_type: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            entity_type: NonEmptyString::new(entity_type)?,
            fields: Vec::new(),
        })
    }

    /// Appends a field declaration.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }

    /// Returns the raw field declarations.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Normalized field metadata used to build and relax permission suites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissableField {
    name: String,
    allowed_access_levels: BTreeSet<AccessLevel>,
    public_access_levels: BTreeSet<AccessLevel>,
}

impl PermissableField {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the structurally valid access levels.
    #[must_use]
    pub fn allowed_access_levels(&self) -> &BTreeSet<AccessLevel> {
        &self.allowed_access_levels
    }

    /// Returns the access levels at which the field is public.
    #[must_use]
    pub fn public_access_levels(&self) -> &BTreeSet<AccessLevel> {
        &self.public_access_levels
    }

    /// Returns whether the level is structurally valid for this field.
    #[must_use]
    pub fn allows(&self, access_level: AccessLevel) -> bool {
        self.allowed_access_levels.contains(&access_level)
    }

    /// Returns whether the field is public at the level.
    #[must_use]
    pub fn is_public(&self, access_level: AccessLevel) -> bool {
        self.public_access_levels.contains(&access_level)
    }
}

/// Extracts the permissable fields of an entity descriptor.
///
/// Fields without any access declaration take part in nothing and are left
/// out. Declaration order is preserved.
pub fn extract_fields(descriptor: &EntityDescriptor) -> AppResult<Vec<PermissableField>> {
    let entity_type = descriptor.entity_type();
    let mut seen_names = HashSet::new();
    let mut fields = Vec::with_capacity(descriptor.fields.len());

    for field in &descriptor.fields {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidFieldSpec(format!(
                "entity '{entity_type}' declares a field with an empty name"
            )));
        }

        if !seen_names.insert(name) {
            return Err(AppError::InvalidFieldSpec(format!(
                "field '{entity_type}.{name}' is declared more than once"
            )));
        }

        let allowed_access_levels = collect_levels(entity_type, name, "access", &field.access)?;
        let public_access_levels = collect_levels(entity_type, name, "public", &field.public)?;

        if let Some(level) = public_access_levels
            .iter()
            .find(|level| !allowed_access_levels.contains(*level))
        {
            return Err(AppError::InvalidFieldSpec(format!(
                "field '{entity_type}.{name}' is public for '{level}' but does not declare that access level"
            )));
        }

        if allowed_access_levels.is_empty() {
            continue;
        }

        fields.push(PermissableField {
            name: name.to_owned(),
            allowed_access_levels,
            public_access_levels,
        });
    }

    Ok(fields)
}

fn collect_levels(
    entity_type: &str,
    field: &str,
    declaration: &str,
    levels: &[AccessLevel],
) -> AppResult<BTreeSet<AccessLevel>> {
    let mut collected = BTreeSet::new();

    for level in levels {
        if !level.is_field_level() {
            return Err(AppError::InvalidFieldSpec(format!(
                "field '{entity_type}.{field}' declares type-level access '{level}' in '{declaration}'"
            )));
        }

        if !collected.insert(*level) {
            return Err(AppError::InvalidFieldSpec(format!(
                "field '{entity_type}.{field}' repeats '{level}' in '{declaration}'"
            )));
        }
    }

    Ok(collected)
}
