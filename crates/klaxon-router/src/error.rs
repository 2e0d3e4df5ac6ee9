use klaxon_common::types::CheckId;
use klaxon_store::StoreError;

/// Errors that can occur within the routing core.
///
/// Degraded-but-recoverable conditions (an invalid timezone name, a
/// malformed time restriction) are handled locally with a warning and do
/// not surface here during routing; the [`RouterError::InvalidConfiguration`]
/// variant exists for the operator-facing validation surfaces.
///
/// # Examples
///
/// ```rust
/// use klaxon_router::error::RouterError;
///
/// let err = RouterError::NotFound {
///     entity: "contact",
///     id: "c-99".to_string(),
/// };
/// assert!(err.to_string().contains("contact"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A referenced record was not found in the store. No partial routing
    /// is performed when this surfaces mid-cycle.
    #[error("Router: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An unscheduled maintenance window is already open for the check.
    /// The caller decides whether to close-then-reopen.
    #[error("Router: unscheduled maintenance already open for check '{check}'")]
    Conflict { check: CheckId },

    /// Operator-supplied configuration failed validation.
    #[error("Router: invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The underlying key-value store failed. The routing cycle fails
    /// atomically: no dispatch list is returned and no throttle state is
    /// mutated that the caller may rely on.
    #[error("Router: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::Store(StoreError::Json(err))
    }
}

/// Convenience `Result` alias for routing operations.
pub type Result<T> = std::result::Result<T, RouterError>;
