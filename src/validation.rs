use crate::error::{AppError, AppResult};
use crate::models::DeploymentRequest;

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for corp, site and service identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Maximum length for values forwarded as upstream headers.
///
/// Generous enough for API tokens while keeping request headers bounded.
pub const MAX_HEADER_VALUE_LENGTH: usize = 4096;

/// Validate every field of a deployment payload.
///
/// Runs before any outbound request is built, so an invalid payload never
/// produces upstream traffic.
pub fn validate_deployment_request(request: &DeploymentRequest) -> AppResult<()> {
    validate_header_field(&request.email, "email")?;
    validate_header_field(&request.token, "token")?;
    validate_identifier(&request.corp_name, "corpName")?;
    validate_identifier(&request.site_name, "siteName")?;
    validate_identifier(&request.fastly_sid, "fastlySID")?;
    validate_header_field(&request.fastly_key, "fastlyKey")?;
    Ok(())
}

/// Validate an identifier that becomes a URL path segment.
///
/// Rules:
/// - Must be between 1 and 255 characters
/// - Must start with an alphanumeric character
/// - Can contain alphanumeric characters, dots, underscores, and hyphens
pub fn validate_identifier(value: &str, field: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} cannot exceed {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }

    if !value.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest(format!(
            "{field} must start with an alphanumeric character"
        )));
    }

    if let Some((i, c)) = value
        .chars()
        .enumerate()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(AppError::BadRequest(format!(
            "{field} contains invalid character '{}' at position {i}. \
             Only alphanumeric characters, dots, underscores, and hyphens are allowed",
            c.escape_default()
        )));
    }

    Ok(())
}

/// Validate a value that is forwarded as an upstream request header.
///
/// Rules:
/// - Must not be empty or whitespace only
/// - Must not exceed 4096 bytes
/// - Must not contain control characters (they cannot appear in headers)
pub fn validate_header_field(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }

    if value.len() > MAX_HEADER_VALUE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} cannot exceed {MAX_HEADER_VALUE_LENGTH} bytes"
        )));
    }

    if let Some(pos) = value.chars().position(|c| c.is_control()) {
        return Err(AppError::BadRequest(format!(
            "{field} contains invalid control character at position {pos}"
        )));
    }

    Ok(())
}
