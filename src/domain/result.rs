//! Result type alias for FhirLink

use super::errors::FhirLinkError;

/// Result type alias for FhirLink operations
///
/// # Examples
///
/// ```
/// use fhirlink::domain::result::Result;
/// use fhirlink::domain::errors::FhirLinkError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FhirLinkError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FhirLinkError>;
