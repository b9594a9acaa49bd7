use fieldgate_core::AppError;
use fieldgate_domain::PermissionPolicy;

const BUNDLED_POLICY: &str = include_str!("../policy/permissions.json");

/// Loads the policy description from `path`, or the one bundled with the binary.
pub fn load_permission_policy(path: Option<&str>) -> Result<PermissionPolicy, AppError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|error| {
                AppError::Validation(format!(
                    "failed to read permission policy from '{path}': {error}"
                ))
            })?;
            PermissionPolicy::from_json(contents.as_str())
        }
        None => PermissionPolicy::from_json(BUNDLED_POLICY),
    }
}
