//! Error types for the regsweep library.
//!
//! The taxonomy is deliberately small. Classification, linkage, and policy
//! evaluation resolve their failures locally to a conservative default
//! (exclude from cascade, exclude from deletion) and never surface here.
//! Only failures that make the registry snapshot incomplete — and therefore
//! make any deletion decision unsafe — propagate as [`SweepError`].
//!
//! Per-item deletion failures are not errors in this sense: they are
//! recorded as [`DeleteError`] outcomes and never abort the batch.

/// Result type alias for operations that may return a SweepError.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Fatal errors that invalidate the run.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// A registry API call failed during enumeration. The snapshot is
    /// incomplete, so no deletion may be planned from it.
    #[error("registry error while {context}: {source}")]
    Registry {
        /// What the registry was being asked to do.
        context: String,
        /// The underlying transport or service error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The registry id could not be resolved and no explicit override was
    /// supplied. The message carries the operator instruction.
    #[error("registry id could not be resolved: {0}")]
    RegistryIdUnresolved(String),
}

impl SweepError {
    /// Wraps a transport/service error with the enumeration step it broke.
    pub fn registry(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SweepError::Registry {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Categorized per-item deletion failure.
///
/// Deletion is best-effort and idempotent: a [`NotFound`] on an
/// already-absent digest is recorded but treated as benign by callers.
///
/// [`NotFound`]: DeleteError::NotFound
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    /// The digest no longer exists in the repository.
    #[error("image not found")]
    NotFound,

    /// The deletion request was rejected as malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The registry failed server-side, or the call did not complete.
    #[error("server error: {0}")]
    Server(String),
}
