//! # Repository Layer
//!
//! Data access layer for the realtime backend. Each repository owns a
//! clone of the connection pool and encapsulates the SQL for one
//! family of tables.
//!
//! ## Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                       │
//! │                                                             │
//! │  Actors / Dispatcher / HTTP handlers                        │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Repository (this layer)                                   │
//! │       │  - SQL queries live here                           │
//! │       │  - Returns domain types from atlas-core            │
//! │       ▼                                                     │
//! │  SqlitePool                                                │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod notification;
pub mod state;
pub mod warranty;

pub use notification::NotificationRepository;
pub use state::ActorStateRepository;
pub use warranty::WarrantyRepository;
