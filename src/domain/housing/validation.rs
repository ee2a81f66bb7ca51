//! Housing validation rules

use crate::domain::DomainError;

pub const MAX_SHED_NAME_LENGTH: usize = 100;
pub const MAX_CAGE_CODE_LENGTH: usize = 20;

pub fn validate_shed_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("Shed name cannot be empty"));
    }

    if name.chars().count() > MAX_SHED_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Shed name cannot exceed {} characters",
            MAX_SHED_NAME_LENGTH
        )));
    }

    Ok(())
}

pub fn validate_cage_code(code: &str) -> Result<(), DomainError> {
    if code.is_empty() {
        return Err(DomainError::validation("Cage code cannot be empty"));
    }

    if code.len() > MAX_CAGE_CODE_LENGTH {
        return Err(DomainError::validation(format!(
            "Cage code cannot exceed {} characters",
            MAX_CAGE_CODE_LENGTH
        )));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(DomainError::validation(
            "Cage code may only contain letters, digits and hyphens",
        ));
    }

    Ok(())
}

pub fn validate_capacity(capacity: u32) -> Result<(), DomainError> {
    if capacity == 0 {
        return Err(DomainError::validation("Cage capacity must be at least 1"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shed_name_length() {
        assert!(validate_shed_name("Galpón 1").is_ok());
        assert!(validate_shed_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_cage_code_characters() {
        assert!(validate_cage_code("J-01").is_ok());
        assert!(validate_cage_code("J 01").is_err());
        assert!(validate_cage_code("J_01").is_err());
        assert!(validate_cage_code("").is_err());
    }
}
