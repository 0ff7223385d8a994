//! # Error Types
//!
//! Domain-specific error types for atlas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atlas-core errors (this file)                                         │
//! │  └── CoreError       - Domain rule violations (conflicts, bad input)   │
//! │                                                                         │
//! │  atlas-db errors (separate crate)                                      │
//! │  └── DbError         - Database operation failures                     │
//! │                                                                         │
//! │  atlas-realtime errors (separate crate)                                │
//! │  └── RealtimeError   - Protocol/persistence/delivery, wraps the above  │
//! │                                                                         │
//! │  Flow: CoreError → RealtimeError → wire `error` frame / HTTP status    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (transaction ID, quantity, etc.)
//! 3. Errors are enum variants, never String
//! 4. Conflict errors leave state unchanged - callers rely on that

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain logic errors for the realtime state machines.
///
/// These represent rule violations surfaced to the caller as typed
/// rejections; none of them mutates state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A transaction with this ID already exists in the active set.
    ///
    /// ## When This Occurs
    /// - Two registers create the same transaction ID
    /// - A client retries a `create` that already succeeded
    #[error("Transaction already exists: {id}")]
    DuplicateTransaction { id: String },

    /// No active transaction with this ID.
    ///
    /// ## When This Occurs
    /// - `update`/`complete`/`cancel` on an unknown ID
    /// - The transaction already reached a terminal state and was removed
    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    /// A requested quantity is negative.
    ///
    /// Quantities in requests must be >= 0; the ledger clamps RESULTS at
    /// zero, but a negative request is a caller bug and is rejected before
    /// any state change.
    #[error("Invalid quantity: {value}")]
    InvalidQuantity { value: i64 },

    /// A payload is structurally valid JSON but violates a domain rule.
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

impl CoreError {
    /// Creates an InvalidPayload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        CoreError::InvalidPayload {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DuplicateTransaction {
            id: "T-001".to_string(),
        };
        assert_eq!(err.to_string(), "Transaction already exists: T-001");

        let err = CoreError::InvalidQuantity { value: -3 };
        assert_eq!(err.to_string(), "Invalid quantity: -3");
    }

    #[test]
    fn test_invalid_payload_helper() {
        let err = CoreError::invalid_payload("expiryDate is required");
        assert!(matches!(err, CoreError::InvalidPayload { .. }));
        assert!(err.to_string().contains("expiryDate"));
    }
}
