//! Name validation for collections and record fields.

use crate::error::CoreError;

/// Maximum length of a collection name, in bytes.
pub const MAX_COLLECTION_NAME_LEN: usize = 120;

/// Validate a collection name.
///
/// Rules:
/// - Non-empty, at most [`MAX_COLLECTION_NAME_LEN`] bytes
/// - No `$` and no NUL
/// - Must not start with `system.`
pub fn validate_collection_name(name: &str) -> Result<(), CoreError> {
    let invalid = |reason: &str| CoreError::InvalidCollectionName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(invalid("name is too long"));
    }
    if name.contains('$') {
        return Err(invalid("name contains '$'"));
    }
    if name.contains('\0') {
        return Err(invalid("name contains NUL"));
    }
    if name.starts_with("system.") {
        return Err(invalid("the system. prefix is reserved"));
    }

    Ok(())
}

/// Validate a top-level record field name.
///
/// Returns the reason on failure.
pub fn validate_field_name(field: &str) -> Result<(), String> {
    if field.is_empty() {
        return Err("empty field name".into());
    }
    if field.starts_with('$') {
        return Err(format!("field {:?} starts with '$'", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        assert!(validate_collection_name("user").is_ok());
        assert!(validate_collection_name("order.items").is_ok());
        assert!(validate_collection_name(&"a".repeat(MAX_COLLECTION_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_invalid_collection_names() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("a$b").is_err());
        assert!(validate_collection_name("a\0b").is_err());
        assert!(validate_collection_name("system.users").is_err());
        assert!(validate_collection_name(&"a".repeat(MAX_COLLECTION_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_field_names() {
        assert!(validate_field_name("name").is_ok());
        assert!(validate_field_name("_id").is_ok());
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("$set").is_err());
    }
}
