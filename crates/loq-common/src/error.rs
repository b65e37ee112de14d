use thiserror::Error;

/// Canonical loq error taxonomy used across crates.
///
/// Classification guidance:
/// - [`LoqError::Parse`]: malformed query text discovered before any stage is built
/// - [`LoqError::InvalidConfig`]: engine configuration contract violations
/// - [`LoqError::Execution`]: runtime stage failures after parsing succeeded
/// - [`LoqError::ResourceExhausted`]: a per-query budget was crossed and the
///   query was cancelled before producing results
///
/// Internal invariant breaches (malformed group key on decode, unknown column
/// value type) are bugs, not errors: they panic with a `BUG:` diagnostic and
/// must never be reached through the public surface.
#[derive(Debug, Error)]
pub enum LoqError {
    /// Malformed query pipeline text.
    ///
    /// Examples:
    /// - missing `(` / `)` around stats function arguments
    /// - unknown pipe or stats function name
    /// - `uniq()` with no fields
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid or inconsistent engine configuration.
    ///
    /// Examples:
    /// - zero worker count
    /// - zero source channel capacity
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Runtime stage failures after parsing succeeded.
    #[error("execution error: {0}")]
    Execution(String),

    /// A per-query resource budget (currently: aggregation state memory) was
    /// exceeded and the query was cancelled without partial results.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Standard loq result alias.
pub type Result<T> = std::result::Result<T, LoqError>;
