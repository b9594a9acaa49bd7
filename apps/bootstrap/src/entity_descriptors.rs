use fieldgate_core::AppError;
use fieldgate_domain::{AccessLevel, EntityDescriptor, EntityRegistry, FieldDescriptor};

const WRITABLE: [AccessLevel; 3] = [AccessLevel::Create, AccessLevel::Read, AccessLevel::Update];
const SET_ONCE: [AccessLevel; 2] = [AccessLevel::Create, AccessLevel::Read];

/// Loads the descriptor table from `path`, or falls back to the built-in table.
pub fn load_entity_registry(path: Option<&str>) -> Result<EntityRegistry, AppError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|error| {
                AppError::Validation(format!(
                    "failed to read entity descriptors from '{path}': {error}"
                ))
            })?;
            EntityRegistry::from_json(contents.as_str())
        }
        None => EntityRegistry::new(built_in_descriptors()?),
    }
}

pub fn built_in_descriptors() -> Result<Vec<EntityDescriptor>, AppError> {
    Ok(vec![
        EntityDescriptor::new("Course")?
            .field(
                FieldDescriptor::new("title")
                    .access(WRITABLE)
                    .public([AccessLevel::Read]),
            )
            .field(FieldDescriptor::new("description").access(WRITABLE))
            .field(
                FieldDescriptor::new("owner_id")
                    .access(SET_ONCE)
                    .public([AccessLevel::Read]),
            ),
        EntityDescriptor::new("Lesson")?
            .field(
                FieldDescriptor::new("title")
                    .access(WRITABLE)
                    .public([AccessLevel::Read]),
            )
            .field(FieldDescriptor::new("body").access(WRITABLE))
            .field(
                FieldDescriptor::new("course_id")
                    .access(SET_ONCE)
                    .public([AccessLevel::Read]),
            ),
        EntityDescriptor::new("Comment")?
            .field(
                FieldDescriptor::new("body")
                    .access(WRITABLE)
                    .public([AccessLevel::Read]),
            )
            .field(
                FieldDescriptor::new("lesson_id")
                    .access(SET_ONCE)
                    .public([AccessLevel::Read]),
            )
            .field(
                FieldDescriptor::new("author_id")
                    .access([AccessLevel::Read])
                    .public([AccessLevel::Read]),
            ),
        // `password_hash` is stored but never exposed through any operation.
        EntityDescriptor::new("User")?
            .field(
                FieldDescriptor::new("display_name")
                    .access(WRITABLE)
                    .public([AccessLevel::Read]),
            )
            .field(FieldDescriptor::new("email").access(WRITABLE))
            .field(FieldDescriptor::new("password_hash")),
    ])
}
