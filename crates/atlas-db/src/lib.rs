//! # atlas-db: Database Layer for Atlas POS
//!
//! This crate provides database access for the Atlas realtime subsystem.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atlas POS Data Flow                              │
//! │                                                                         │
//! │  Actor mutation (inside its gate)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     atlas-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (state,      │    │  (embedded)  │  │   │
//! │  │   │               │    │   warranty,   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│   notification│    │ 001_init.sql │  │   │
//! │  │   │ Management    │    │   )           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (state, warranty, notification)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atlas_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/atlas.db")).await?;
//! db.actor_state().save("inventory", "store-1", "{...}").await?;
//! let blob = db.actor_state().load("inventory", "store-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::notification::NotificationRepository;
pub use repository::state::ActorStateRepository;
pub use repository::warranty::WarrantyRepository;
