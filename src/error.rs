//! Error taxonomy for core operations.
//!
//! | Variant | Scope |
//! |---|---|
//! | `NotFound` | requested id absent; resolved within the request |
//! | `Unauthorized` | credential or token rejected; never says why |
//! | `Validation` | malformed input, rejected instead of coerced |
//! | `Infrastructure` | store fault; isolated to the failing request |

use crate::types::ItemId;

/// Error type for blog operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlogError {
    /// Requested item does not exist.
    #[error("Item not found: {0}")]
    NotFound(ItemId),
    /// Credentials or session token rejected.
    #[error("Unauthorized")]
    Unauthorized,
    /// Malformed or missing input.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Document store unavailable or query failed.
    #[error("Store error: {0}")]
    Infrastructure(String),
}

impl BlogError {
    /// Create an infrastructure error from any store error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Infrastructure(e.to_string())
    }

    /// Whether the failure came from the store rather than the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Parse a non-negative decimal integer path segment.
///
/// Signs, whitespace and overflow are all rejected.
pub fn parse_number(field: &str, raw: &str) -> Result<i64, BlogError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BlogError::Validation(format!(
            "{field} must be a non-negative integer, got {raw:?}"
        )));
    }
    raw.parse::<i64>()
        .map_err(|e| BlogError::Validation(format!("{field} out of range: {e}")))
}

/// Parse an item id path segment.
pub fn parse_item_id(raw: &str) -> Result<ItemId, BlogError> {
    parse_number("id", raw).map(ItemId::new)
}

/// Parse a 1-based page number path segment.
pub fn parse_page_number(raw: &str) -> Result<i64, BlogError> {
    parse_number("page", raw)
}

/// Require a form field to be present.
pub fn require_field(name: &str, value: Option<String>) -> Result<String, BlogError> {
    value.ok_or_else(|| BlogError::Validation(format!("missing required field: {name}")))
}
