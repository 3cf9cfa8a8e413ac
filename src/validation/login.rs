use crate::error::{AppError, Result};
use crate::models::account::AccountPreferences;

/// The longest identity assertion we accept.
const MAX_ASSERTION_LEN: usize = 4096;
/// The longest default-instructions text we accept.
const MAX_INSTRUCTIONS_LEN: usize = 4000;
/// The longest tone/model value we accept.
const MAX_SHORT_FIELD_LEN: usize = 200;

/// Validates an identity assertion before it is sent to the verifier.
pub fn validate_assertion(assertion: &str) -> Result<()> {
    if assertion.trim().is_empty() {
        return Err(AppError::Validation(
            "Identity token must not be empty".to_string(),
        ));
    }

    if assertion.len() > MAX_ASSERTION_LEN {
        return Err(AppError::Validation(
            "Identity token is too long".to_string(),
        ));
    }

    Ok(())
}

/// Validates the writable profile preference fields.
pub fn validate_preferences(preferences: &AccountPreferences) -> Result<()> {
    if let Some(instructions) = &preferences.default_instructions {
        if instructions.len() > MAX_INSTRUCTIONS_LEN {
            return Err(AppError::Validation(
                "Default instructions are too long".to_string(),
            ));
        }
    }

    for (label, value) in [
        ("Default tone", &preferences.default_tone),
        ("Default model", &preferences.default_model),
    ] {
        if let Some(value) = value {
            if value.len() > MAX_SHORT_FIELD_LEN {
                return Err(AppError::Validation(format!("{} is too long", label)));
            }
        }
    }

    Ok(())
}
