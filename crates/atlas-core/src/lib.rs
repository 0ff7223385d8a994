//! # atlas-core: Pure Domain Logic for the Atlas POS Realtime Core
//!
//! This crate holds the state machines behind the four realtime actors
//! as pure, synchronous types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Atlas POS Realtime Core                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  atlas-realtime (actors)                        │   │
//! │  │   WebSocket sessions ──► Concurrency Gate ──► mutate state      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atlas-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌───────────┐ ┌───────────┐ ┌────────────┐ ┌──────────────┐  │   │
//! │  │  │ inventory │ │transaction│ │  schedule  │ │    buffer    │  │   │
//! │  │  │  Ledger   │ │  Ledger   │ │Notification│ │MessageBuffer │  │   │
//! │  │  │ (clamped) │ │(lifecycle)│ │ (dedup)    │ │  (bounded)   │  │   │
//! │  │  └───────────┘ └───────────┘ └────────────┘ └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryRecord, Transaction, ScheduleEntry, ...)
//! - [`buffer`] - Bounded ring buffer for message replay
//! - [`inventory`] - Per-store product-quantity ledger
//! - [`transaction`] - POS transaction lifecycle
//! - [`schedule`] - Notification schedule with per-key dedup
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every transition is deterministic - same fold order
//!    from the same initial state yields the same final state
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Clamped Quantities**: Inventory quantities never go negative
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod buffer;
pub mod error;
pub mod inventory;
pub mod schedule;
pub mod transaction;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use atlas_core::InventoryRecord` instead of
// `use atlas_core::types::InventoryRecord`

pub use buffer::MessageBuffer;
pub use error::{CoreError, CoreResult};
pub use inventory::InventoryLedger;
pub use schedule::NotificationSchedule;
pub use transaction::TransactionLedger;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Days before expiry at which a warranty is considered "expiring".
///
/// ## Why a constant?
/// The reminder window is a business rule, not an infrastructure knob.
/// The realtime config may widen or narrow it per deployment, but this is
/// the default it falls back to.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

/// Default capacity of the notification replay buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
