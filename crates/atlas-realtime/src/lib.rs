//! # atlas-realtime: Realtime Synchronization Layer for Atlas POS
//!
//! Stateful WebSocket actors for the Atlas POS backend: live
//! notifications, store inventory sync, POS transaction state and the
//! warranty lifecycle.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Atlas Realtime Architecture                         │
//! │                                                                         │
//! │  WS clients                    HTTP clients                            │
//! │      │                              │                                   │
//! │      ▼                              ▼                                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    server (axum router)                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │      │                                                                  │
//! │      ▼ resolve actor key (store id / "global")                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  ActorHost ── one ActorCell per key                             │   │
//! │  │                                                                 │   │
//! │  │  ActorCell "store-1"       ActorCell "store-2"                  │   │
//! │  │  ┌───────────────────┐     ┌───────────────────┐                │   │
//! │  │  │ Gate (fair mutex) │     │ Gate (fair mutex) │  ← keys run    │   │
//! │  │  │ State (in memory) │     │ State (in memory) │    in parallel │   │
//! │  │  │ SessionRegistry   │     │ SessionRegistry   │                │   │
//! │  │  │ Broadcaster       │     │ Broadcaster       │                │   │
//! │  │  └───────────────────┘     └───────────────────┘                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │      │ load once / save after each mutation                            │
//! │      ▼                                                                  │
//! │  atlas-db (actor_state snapshots, warranty + notification tables)      │
//! │                                                                         │
//! │  Scheduler ──► WarrantyActor.on_tick() ──► NotificationDispatcher      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`error`] - Error taxonomy and wire error codes
//! - [`message`] - Wire envelopes (tagged JSON frames)
//! - [`session`] - Session registry (per actor instance)
//! - [`broadcast`] - Serialize-once best-effort fan-out
//! - [`gate`] - Per-instance concurrency gate
//! - [`store`] - Typed face of the durable state store
//! - [`runtime`] - Actor host and cells
//! - [`scheduler`] - Self-rearming interval scheduler
//! - [`dispatch`] - Notification dispatch (pending → sent/failed)
//! - [`actors`] - The four actor specializations
//! - [`config`] - TOML configuration with env overrides
//! - [`server`] - HTTP/WS surface

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actors;
pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod message;
pub mod runtime;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RealtimeConfig;
pub use error::{RealtimeError, RealtimeResult};
pub use scheduler::{Scheduler, SchedulerHandle, TickHandler};
pub use server::{router, AppState};
