//! Cuy validation rules

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::DomainError;

/// Upper bound on a plausible adult weight
pub const MAX_WEIGHT_KG: f64 = 5.0;

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{1,19}$").expect("valid cuy code pattern"));

/// Trim and upper-case a code, then check its shape
pub fn normalize_code(code: &str) -> Result<String, DomainError> {
    let code = code.trim().to_uppercase();

    if !CODE_PATTERN.is_match(&code) {
        return Err(DomainError::validation(format!(
            "Invalid cuy code '{}': use 2-20 letters, digits or hyphens",
            code
        )));
    }

    Ok(code)
}

pub fn validate_breed(breed: &str) -> Result<(), DomainError> {
    if breed.is_empty() {
        return Err(DomainError::validation("Breed cannot be empty"));
    }

    Ok(())
}

pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if birth_date > today {
        return Err(DomainError::validation(format!(
            "Birth date {} is in the future",
            birth_date
        )));
    }

    Ok(())
}

pub fn validate_weight(weight_kg: f64) -> Result<(), DomainError> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 || weight_kg > MAX_WEIGHT_KG {
        return Err(DomainError::validation(format!(
            "Weight must be between 0 and {} kg",
            MAX_WEIGHT_KG
        )));
    }

    Ok(())
}
