/// Errors that can occur within the key-value store layer.
///
/// # Examples
///
/// ```rust
/// use klaxon_store::error::StoreError;
///
/// let err = StoreError::Unavailable("connection refused".to_string());
/// assert!(err.to_string().contains("unavailable"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store is unreachable or a bounded access timed out.
    /// Callers must treat the whole operation as not having happened.
    #[error("Store: backend unavailable: {0}")]
    Unavailable(String),

    /// JSON serialization or deserialization of a stored value failed.
    #[error("Store: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic store error for cases not covered by other variants.
    #[error("Store: {0}")]
    Other(String),
}

/// Convenience `Result` alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
