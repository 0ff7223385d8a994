//! # Realtime Error Types
//!
//! Error taxonomy for the realtime layer.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Realtime Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Protocol     │  │     Domain      │  │     Persistence         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  bad frame →    │  │  CoreError →    │  │  DbError →              │ │
//! │  │  error reply,   │  │  typed reject,  │  │  logged + surfaced,     │ │
//! │  │  no state change│  │  no state change│  │  mutation retained      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Delivery     │  │  Configuration  │  │      Internal           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  entry retained │  │  InvalidConfig  │  │  Serialization          │ │
//! │  │  for next tick  │  │  Load/Save      │  │  Channel                │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use atlas_core::CoreError;
use atlas_db::DbError;

/// Result type alias for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Realtime error type covering all failure categories.
///
/// ## Design Principles
/// - Each variant maps to one handling strategy (reject, retain, retry)
/// - `wire_code()` gives the stable on-wire `error.code` string
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum RealtimeError {
    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Malformed or unrecognized client frame.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// WS connect without a required scope query parameter.
    #[error("Missing required query parameter: {0}")]
    MissingScope(&'static str),

    // =========================================================================
    // Domain Errors (conflicts, rejections)
    // =========================================================================
    /// Domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Durable store failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    // =========================================================================
    // Delivery Errors
    // =========================================================================
    /// Notification delivery failed.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// JSON serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    Channel(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for RealtimeError {
    fn from(err: DbError) -> Self {
        RealtimeError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for RealtimeError {
    fn from(err: std::io::Error) -> Self {
        RealtimeError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for RealtimeError {
    fn from(err: toml::de::Error) -> Self {
        RealtimeError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for RealtimeError {
    fn from(err: toml::ser::Error) -> Self {
        RealtimeError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (wire codes + handling strategy)
// =============================================================================

impl RealtimeError {
    /// Returns the stable on-wire error code for `error` reply frames.
    pub fn wire_code(&self) -> &'static str {
        match self {
            RealtimeError::Protocol(_) | RealtimeError::MissingScope(_) => "protocol",
            RealtimeError::Domain(CoreError::DuplicateTransaction { .. }) => "conflict",
            RealtimeError::Domain(CoreError::TransactionNotFound { .. }) => "not_found",
            RealtimeError::Domain(CoreError::InvalidQuantity { .. }) => "invalid_quantity",
            RealtimeError::Domain(CoreError::InvalidPayload { .. }) => "protocol",
            RealtimeError::Persistence(_) => "persistence",
            RealtimeError::Delivery(_) => "delivery",
            RealtimeError::Serialization(_)
            | RealtimeError::Channel(_)
            | RealtimeError::InvalidConfig(_)
            | RealtimeError::ConfigLoadFailed(_)
            | RealtimeError::ConfigSaveFailed(_) => "internal",
        }
    }

    /// Returns true for malformed-input errors (no state change occurred).
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            RealtimeError::Protocol(_)
                | RealtimeError::MissingScope(_)
                | RealtimeError::Domain(CoreError::InvalidPayload { .. })
        )
    }

    /// Returns true for domain conflicts (valid frame, rejected by rules).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RealtimeError::Domain(CoreError::DuplicateTransaction { .. })
        )
    }
}
