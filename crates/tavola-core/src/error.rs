//! # Error Types
//!
//! Domain-specific error types for tavola-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tavola-core errors (this file)                                        │
//! │  ├── ValidationError  - Rejected input (negative price, bad date)      │
//! │  ├── DataAccessError  - Collaborator failed (unreachable, timeout)     │
//! │  └── TaxError         - What resolver/aggregator callers see           │
//! │                                                                         │
//! │  tavola-db errors (separate crate)                                     │
//! │  └── DbError          - Converted into DataAccessError at the trait    │
//! │                                                                         │
//! │  Flow: DbError → DataAccessError → TaxError → checkout flow            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product without a tax category is NOT an error: it resolves to
//! [`RateResolution::Untaxed`](crate::types::RateResolution::Untaxed).

use thiserror::Error;

// =============================================================================
// Tax Error
// =============================================================================

/// Errors returned by rate resolution and order tax aggregation.
///
/// Either variant aborts the whole computation. No partial totals are
/// returned and nothing is retried here.
#[derive(Debug, Error)]
pub enum TaxError {
    /// Input was rejected before any lookup ran.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// A product or rule lookup failed.
    ///
    /// ## When This Occurs
    /// - Rule store unreachable or pool closed
    /// - Query exceeded the configured timeout
    /// - Stored row could not be decoded (e.g. negative rate)
    #[error("Data access failed: {0}")]
    DataAccess(#[from] DataAccessError),
}

impl TaxError {
    /// Returns true when the failure came from a collaborator, not the input.
    pub fn is_data_access(&self) -> bool {
        matches!(self, TaxError::DataAccess(_))
    }
}

// =============================================================================
// Data Access Error
// =============================================================================

/// Failure reported by a [`ProductTaxLookup`](crate::lookup::ProductTaxLookup)
/// or [`TaxRuleLookup`](crate::lookup::TaxRuleLookup) implementation.
///
/// `store` names the store that failed (`"products"`, `"tax_rules"`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataAccessError {
    /// Store could not be reached or the query failed.
    #[error("{store} unavailable: {message}")]
    Unavailable { store: String, message: String },

    /// Store did not answer within the per-call timeout.
    #[error("{store} timed out after {timeout_ms}ms")]
    Timeout { store: String, timeout_ms: u64 },

    /// Store answered with data that breaks an invariant.
    #[error("{store} returned malformed data: {message}")]
    Malformed { store: String, message: String },
}

impl DataAccessError {
    /// Creates an Unavailable error.
    pub fn unavailable(store: impl Into<String>, message: impl Into<String>) -> Self {
        DataAccessError::Unavailable {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Creates a Timeout error.
    pub fn timeout(store: impl Into<String>, timeout_ms: u64) -> Self {
        DataAccessError::Timeout {
            store: store.into(),
            timeout_ms,
        }
    }

    /// Creates a Malformed error.
    pub fn malformed(store: impl Into<String>, message: impl Into<String>) -> Self {
        DataAccessError::Malformed {
            store: store.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before computation starts. Values are never clamped to make them
/// pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is below zero.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: i64 },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. unparseable date or rate).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. two rules with the same effective date).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with TaxError.
pub type TaxResult<T> = Result<T, TaxError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Negative {
            field: "items[1].price_cents".to_string(),
            value: -5,
        };
        assert_eq!(
            err.to_string(),
            "items[1].price_cents must not be negative (got -5)"
        );

        let err = ValidationError::Required {
            field: "product_id".to_string(),
        };
        assert_eq!(err.to_string(), "product_id is required");
    }

    #[test]
    fn test_data_access_error_messages() {
        let err = DataAccessError::timeout("tax_rules", 250);
        assert_eq!(err.to_string(), "tax_rules timed out after 250ms");

        let err = DataAccessError::malformed("tax_rules", "rate_bps -1");
        assert_eq!(
            err.to_string(),
            "tax_rules returned malformed data: rate_bps -1"
        );
    }

    #[test]
    fn test_conversions_into_tax_error() {
        let err: TaxError = ValidationError::Required {
            field: "product_id".to_string(),
        }
        .into();
        assert!(matches!(err, TaxError::InvalidInput(_)));
        assert!(!err.is_data_access());

        let err: TaxError = DataAccessError::unavailable("products", "pool closed").into();
        assert!(err.is_data_access());
    }
}
