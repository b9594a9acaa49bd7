use std::collections::BTreeMap;

use fieldgate_core::{AppError, AppResult};

use crate::{EntityDescriptor, PermissableField, extract_fields};

/// Validated table of every entity type the engine models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRegistry {
    descriptors: BTreeMap<String, EntityDescriptor>,
}

impl EntityRegistry {
    /// Builds a registry, rejecting duplicate entity types and malformed field declarations.
    pub fn new(descriptors: impl IntoIterator<Item = EntityDescriptor>) -> AppResult<Self> {
        let mut by_type = BTreeMap::new();

        for descriptor in descriptors {
            extract_fields(&descriptor)?;

            let entity_type = descriptor.entity_type().to_owned();
            if by_type.insert(entity_type.clone(), descriptor).is_some() {
                return Err(AppError::Validation(format!(
                    "entity type '{entity_type}' is described more than once"
                )));
            }
        }

        Ok(Self {
            descriptors: by_type,
        })
    }

    /// Parses a JSON array of entity descriptors.
    pub fn from_json(value: &str) -> AppResult<Self> {
        let descriptors = serde_json::from_str::<Vec<EntityDescriptor>>(value).map_err(|error| {
            AppError::InvalidFieldSpec(format!("invalid entity descriptor table: {error}"))
        })?;

        Self::new(descriptors)
    }

    /// Returns the descriptor for an entity type.
    pub fn get(&self, entity_type: &str) -> AppResult<&EntityDescriptor> {
        self.descriptors.get(entity_type).ok_or_else(|| {
            AppError::NotFound(format!(
                "entity type '{entity_type}' has no registered descriptor"
            ))
        })
    }

    /// Re-extracts the permissable fields of an entity type.
    pub fn permissable_fields(&self, entity_type: &str) -> AppResult<Vec<PermissableField>> {
        extract_fields(self.get(entity_type)?)
    }

    /// Iterates registered entity type names in sorted order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Returns the number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns whether no entity type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use fieldgate_core::AppError;

    use super::EntityRegistry;
    use crate::AccessLevel::{Read, Update};
    use crate::{EntityDescriptor, FieldDescriptor};

    #[test]
    fn duplicate_entity_types_are_rejected() {
        let first = EntityDescriptor::new("Lesson").unwrap_or_else(|_| unreachable!());
        let second = EntityDescriptor::new("Lesson").unwrap_or_else(|_| unreachable!());

        assert!(EntityRegistry::new([first, second]).is_err());
    }

    #[test]
    fn malformed_descriptor_fails_registration() {
        let descriptor = EntityDescriptor::new("Lesson")
            .unwrap_or_else(|_| unreachable!())
            .field(FieldDescriptor::new("title").public([Read]));

        assert!(matches!(
            EntityRegistry::new([descriptor]),
            Err(AppError::InvalidFieldSpec(_))
        ));
    }

    #[test]
    fn unknown_entity_type_is_not_found() {
        let registry = EntityRegistry::default();
        assert!(matches!(
            registry.get("Lesson"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn registry_loads_from_json() {
        let registry = EntityRegistry::from_json(
            r#"[
                { "entity_type": "Course", "fields": [{ "name": "name", "access": ["read", "update"] }] },
                { "entity_type": "Lesson" }
            ]"#,
        )
        .unwrap_or_default();

        assert_eq!(
            registry.entity_types().collect::<Vec<_>>(),
            vec!["Course", "Lesson"]
        );
        let fields = registry.permissable_fields("Course").unwrap_or_default();
        assert_eq!(fields.len(), 1);
        assert!(fields[0].allows(Update));
    }

    #[test]
    fn misspelled_descriptor_keys_are_rejected() {
        let misspelled_field = EntityRegistry::from_json(
            r#"[{ "entity_type": "Course", "fields": [{ "name": "name", "acess": ["read"] }] }]"#,
        );
        assert!(matches!(misspelled_field, Err(AppError::InvalidFieldSpec(_))));

        let misspelled_entity =
            EntityRegistry::from_json(r#"[{ "entity_type": "Course", "feilds": [] }]"#);
        assert!(matches!(misspelled_entity, Err(AppError::InvalidFieldSpec(_))));
    }
}
