//! # Broadcaster
//!
//! Serialize-once, best-effort fan-out to an instance's sessions.
//!
//! ## Fan-Out Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Broadcast Fan-Out                                │
//! │                                                                         │
//! │  outbound frame (already serialized to Utf8Bytes - cloned cheaply)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each session in the registry snapshot:                            │
//! │       │                                                                 │
//! │       ├── scoped? predicate decides membership                         │
//! │       │                                                                 │
//! │       ├── try_send(frame)  ← never awaits                              │
//! │       │       │                                                         │
//! │       │       ├── ok   ──► delivered to the writer task                │
//! │       │       └── err  ──► session collected for pruning               │
//! │       │            (queue full / receiver dropped)                     │
//! │       ▼                                                                 │
//! │  prune failed sessions, return reached count                           │
//! │                                                                         │
//! │  One dead session never blocks or fails delivery to the rest.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::ws::{Message, Utf8Bytes};
use tracing::{debug, warn};

use crate::session::{SessionHandle, SessionId, SessionRegistry};

/// Fan-out over one actor instance's session registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: SessionRegistry,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry.
    pub fn new(registry: SessionRegistry) -> Self {
        Broadcaster { registry }
    }

    /// Broadcasts a frame to every session.
    ///
    /// ## Returns
    /// The number of sessions the frame was queued for.
    pub async fn broadcast(&self, frame: Utf8Bytes) -> usize {
        self.broadcast_scoped(frame, |_| true).await
    }

    /// Broadcasts a frame to the sessions matching a predicate.
    ///
    /// The frame is serialized once by the caller; per-session sends
    /// are `try_send` so a slow consumer is pruned, never awaited.
    pub async fn broadcast_scoped<F>(&self, frame: Utf8Bytes, include: F) -> usize
    where
        F: Fn(&SessionHandle) -> bool,
    {
        let handles = self.registry.handles().await;
        let mut reached = 0;
        let mut stale: Vec<SessionId> = Vec::new();

        for handle in handles.iter().filter(|h| include(h)) {
            match handle.sender.try_send(Message::Text(frame.clone())) {
                Ok(()) => reached += 1,
                Err(_) => {
                    // Queue full or receiver gone - prune reactively
                    warn!(session_id = %handle.id, "Pruning unreachable session");
                    stale.push(handle.id);
                }
            }
        }

        for id in stale {
            self.registry.unregister(id).await;
        }

        debug!(reached, "Broadcast fanned out");
        reached
    }

    /// Sends a frame to a single session (history replay).
    ///
    /// ## Returns
    /// `true` if the frame was queued; a failed send prunes the session.
    pub async fn send_to(&self, id: SessionId, frame: Utf8Bytes) -> bool {
        let Some(handle) = self.registry.get(id).await else {
            return false;
        };

        match handle.sender.try_send(Message::Text(frame)) {
            Ok(()) => true,
            Err(_) => {
                warn!(session_id = %id, "Pruning unreachable session");
                self.registry.unregister(id).await;
                false
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
