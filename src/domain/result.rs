//! Result type alias for Toolpack

use super::errors::ToolpackError;

/// Result type alias for Toolpack operations
///
/// # Examples
///
/// ```
/// use toolpack::domain::result::Result;
/// use toolpack::domain::errors::ToolpackError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ToolpackError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ToolpackError>;
