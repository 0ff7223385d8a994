//! # Actor Specializations
//!
//! The four realtime actors, all built on the same machinery:
//! resolve a cell by key, run the mutation under its gate, persist the
//! whole state blob, broadcast, reply.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Actor Specializations                             │
//! │                                                                         │
//! │  Actor          Key        State               Broadcast scope         │
//! │  ─────────────  ─────────  ──────────────────  ──────────────────      │
//! │  notification   "global"   MessageBuffer       every session           │
//! │  inventory      store id   InventoryLedger     the store's sessions    │
//! │  pos            store id   TransactionLedger   the store's sessions    │
//! │  warranty       "global"   NotificationSchedule every session          │
//! │                                                                         │
//! │  Per-store scoping is structural: each store key gets its own cell     │
//! │  and thus its own session registry - a store-1 broadcast cannot        │
//! │  reach a store-2 session because they live in different cells.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use tokio::sync::mpsc;

use crate::session::{SessionId, SessionScope};

pub mod inventory;
pub mod notification;
pub mod transaction;
pub mod warranty;

pub use inventory::InventoryActor;
pub use notification::NotificationActor;
pub use transaction::TransactionActor;
pub use warranty::WarrantyActor;

/// The socket-facing surface shared by all four actors.
///
/// The server's socket loop drives connections through this trait;
/// everything actor-specific (frame decoding, state, broadcast scope)
/// lives behind it.
#[async_trait]
pub trait WsActor: Send + Sync {
    /// Registers a session and returns its ID. May queue replay
    /// frames (the notification actor sends recent history here).
    async fn connect(&self, scope: &SessionScope, sender: mpsc::Sender<Message>) -> SessionId;

    /// Handles one inbound text frame and returns the reply frame.
    ///
    /// Broadcasts triggered by the frame are queued during handling,
    /// before the reply, so the sender sees the broadcast first.
    async fn handle_text(&self, scope: &SessionScope, text: &str) -> Utf8Bytes;

    /// Removes a session after its socket closes.
    async fn disconnect(&self, scope: &SessionScope, session_id: SessionId);
}
