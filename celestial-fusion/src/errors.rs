//! Error types for the spatial engine.
//!
//! Every fallible operation returns [`FusionResult<T>`]. Each variant names
//! one way the engine refuses to continue:
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`InvalidRange`](FusionError::InvalidRange) | query bounds are inverted, non-finite or outside the sphere |
//! | [`InvalidEntry`](FusionError::InvalidEntry) | an entry fails range-sanity checks at catalog construction |
//! | [`DuplicateEntry`](FusionError::DuplicateEntry) / [`UnknownEntry`](FusionError::UnknownEntry) | id lookups fail |
//! | [`IndexMismatch`](FusionError::IndexMismatch) | a candidate index was built from a different snapshot |
//! | [`BudgetExceeded`](FusionError::BudgetExceeded) | a cross-match run overran its wall-clock budget |
//!
//! Empty results are never errors, and degenerate geometry (pole proximity,
//! vanishing `cos(dec)`) is absorbed by the geometry kernel instead of being
//! reported.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    /// Query input that cannot describe a region on the sphere.
    #[error("Invalid range in {operation}: {message}")]
    InvalidRange { operation: String, message: String },

    /// Entry rejected while building a catalog snapshot.
    #[error("Invalid entry {id}: {message}")]
    InvalidEntry { id: String, message: String },

    #[error("Duplicate entry id: {0}")]
    DuplicateEntry(String),

    #[error("Unknown entry id: {0}")]
    UnknownEntry(String),

    #[error("Candidate index covers {index} entries but the catalog holds {catalog}")]
    IndexMismatch { index: usize, catalog: usize },

    /// The run was stopped between candidate batches; nothing was assigned.
    #[error("Cross-match exceeded its time budget after {processed} of {total} entries")]
    BudgetExceeded { processed: usize, total: usize },
}

/// Convenience alias for `Result<T, FusionError>`.
pub type FusionResult<T> = Result<T, FusionError>;

impl FusionError {
    pub fn invalid_range(operation: &str, reason: &str) -> Self {
        Self::InvalidRange {
            operation: operation.to_string(),
            message: reason.to_string(),
        }
    }

    pub fn invalid_entry(id: &str, reason: &str) -> Self {
        Self::InvalidEntry {
            id: id.to_string(),
            message: reason.to_string(),
        }
    }

    /// Returns `true` if the same call could succeed on retry.
    ///
    /// Only a budget overrun qualifies: a larger budget or a smaller catalog
    /// lets the run finish. Everything else is a caller input problem.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_message() {
        let err = FusionError::invalid_range("search_box", "dec_min 10 > dec_max 5");
        assert_eq!(
            err.to_string(),
            "Invalid range in search_box: dec_min 10 > dec_max 5"
        );
    }

    #[test]
    fn test_invalid_entry_message() {
        let err = FusionError::invalid_entry("gaia-1", "RA 400 outside [0, 360)");
        assert!(err.to_string().contains("gaia-1"));
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_index_mismatch_message() {
        let err = FusionError::IndexMismatch {
            index: 3,
            catalog: 4,
        };
        assert!(err.to_string().contains("covers 3 entries"));
        assert!(err.to_string().contains("holds 4"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(FusionError::BudgetExceeded {
            processed: 10,
            total: 20
        }
        .is_recoverable());
        assert!(!FusionError::UnknownEntry("x".into()).is_recoverable());
        assert!(!FusionError::invalid_range("cone_search", "radius < 0").is_recoverable());
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<FusionError>();
        _assert_sync::<FusionError>();
    }
}
