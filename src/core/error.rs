//! Typed errors for specification construction, evaluation and repositories
//!
//! # Error Categories
//!
//! - [`SpecificationError`]: defects in how a specification was built. These
//!   are raised synchronously at build or evaluation time and are never
//!   retried.
//! - [`RepositoryError`]: failures surfaced by repository operations, which
//!   wrap specification errors alongside storage and cancellation failures.
//!
//! # Example
//!
//! ```rust,ignore
//! match repository.get_by_spec(&spec, None).await {
//!     Ok(issues) => println!("{} issues", issues.len()),
//!     Err(RepositoryError::Specification(SpecificationError::DuplicateOrderChain)) => {
//!         eprintln!("specification orders twice");
//!     }
//!     Err(e) => eprintln!("{} ({})", e, e.error_code()),
//! }
//! ```

use thiserror::Error;

/// Errors raised while building or evaluating a specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    /// `skip` was set more than once
    #[error(
        "Duplicate use of skip(). Ensure you don't use skip() more than once in the same specification."
    )]
    DuplicateSkip,

    /// `take` was set more than once
    #[error(
        "Duplicate use of take(). Ensure you don't use take() more than once in the same specification."
    )]
    DuplicateTake,

    /// More than one primary sort key
    #[error(
        "The specification contains more than one order_by chain. Use then_by for subsequent keys."
    )]
    DuplicateOrderChain,

    /// A projection was requested but no selector is configured
    #[error("The specification must have a selector defined to produce a projected result.")]
    MissingSelector,

    /// A search pattern could not be compiled
    #[error("Invalid search pattern: \"{pattern}\"")]
    InvalidSearchPattern { pattern: String },

    /// Caching was enabled without a usable specification name
    #[error("Invalid cache configuration: {reason}")]
    InvalidCacheConfiguration { reason: String },
}

impl SpecificationError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SpecificationError::DuplicateSkip => "DUPLICATE_SKIP",
            SpecificationError::DuplicateTake => "DUPLICATE_TAKE",
            SpecificationError::DuplicateOrderChain => "DUPLICATE_ORDER_CHAIN",
            SpecificationError::MissingSelector => "MISSING_SELECTOR",
            SpecificationError::InvalidSearchPattern { .. } => "INVALID_SEARCH_PATTERN",
            SpecificationError::InvalidCacheConfiguration { .. } => "INVALID_CACHE_CONFIGURATION",
        }
    }
}

/// Errors returned by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The specification itself is defective
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    /// An entity expected to exist was not found
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: i64 },

    /// The caller cancelled the operation before it reached the store
    #[error("Operation cancelled")]
    Cancelled,

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::Specification(e) => e.error_code(),
            RepositoryError::NotFound { .. } => "ENTITY_NOT_FOUND",
            RepositoryError::Cancelled => "CANCELLED",
            RepositoryError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the failure points at a defect in the calling code
    pub fn is_programming_error(&self) -> bool {
        matches!(self, RepositoryError::Specification(_))
    }
}

/// Result alias for specification operations
pub type SpecResult<T> = std::result::Result<T, SpecificationError>;

/// Result alias for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
