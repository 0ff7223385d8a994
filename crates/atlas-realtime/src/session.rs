//! # Session Registry
//!
//! Connected WebSocket sessions, tracked per actor instance.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  WS upgrade accepted                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mpsc::channel(64) ← bounded per-session outbound queue                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  registry.register(handle)                                             │
//! │       │                                                                 │
//! │       │  ... frames flow: queue → writer task → socket ...             │
//! │       │                                                                 │
//! │       ├── socket closes        ──► unregister (connection task)        │
//! │       └── try_send fails       ──► unregister (broadcast path)         │
//! │            (queue full or closed = slow/dead consumer: pruned          │
//! │             reactively, never awaited)                                 │
//! │                                                                         │
//! │  Sessions are in-memory only. A registry belongs to exactly one        │
//! │  actor instance and is never persisted.                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Capacity of each session's outbound frame queue.
///
/// A session that falls this far behind is pruned rather than awaited,
/// so one slow consumer never stalls a broadcast.
pub const SESSION_QUEUE_DEPTH: usize = 64;

// =============================================================================
// Session Identity & Scope
// =============================================================================

/// Unique identifier for a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh session ID.
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Connection scope, decoded from WS query parameters.
///
/// `store_id` routes the session to a per-store actor instance (and
/// scopes broadcasts); `client_id` / `device_id` are informational.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionScope {
    #[serde(rename = "storeId")]
    pub store_id: Option<String>,

    #[serde(rename = "clientId")]
    pub client_id: Option<String>,

    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

// =============================================================================
// Session Handle & Registry
// =============================================================================

/// A connected session: its identity, scope and outbound queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub scope: SessionScope,
    pub sender: mpsc::Sender<Message>,
}

/// Registry of the sessions attached to one actor instance.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and returns its ID.
    pub async fn register(&self, scope: SessionScope, sender: mpsc::Sender<Message>) -> SessionId {
        let id = SessionId::generate();
        let handle = SessionHandle { id, scope, sender };

        self.sessions.write().await.insert(id, handle);
        debug!(session_id = %id, "Session registered");

        id
    }

    /// Removes a session. Safe to call twice (close path and prune
    /// path can race).
    pub async fn unregister(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            debug!(session_id = %id, "Session unregistered");
        }
    }

    /// Returns a snapshot of all current session handles.
    pub async fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Looks up a single session.
    pub async fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Number of connected sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no sessions are connected.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Current session IDs (diagnostics).
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(store: &str) -> SessionScope {
        SessionScope {
            store_id: Some(store.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(SESSION_QUEUE_DEPTH);

        let id = registry.register(scope("store-1"), tx).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(id).await.is_some());

        registry.unregister(id).await;
        assert!(registry.is_empty().await);

        // Double unregister is a no-op
        registry.unregister(id).await;
    }

    #[tokio::test]
    async fn test_clones_share_sessions() {
        let registry = SessionRegistry::new();
        let clone = registry.clone();
        let (tx, _rx) = mpsc::channel(SESSION_QUEUE_DEPTH);

        registry.register(SessionScope::default(), tx).await;
        assert_eq!(clone.len().await, 1);
    }

    #[test]
    fn test_scope_decodes_from_query() {
        let scope: SessionScope =
            serde_json::from_str(r#"{"storeId":"store-9","deviceId":"till-2"}"#).unwrap();
        assert_eq!(scope.store_id.as_deref(), Some("store-9"));
        assert_eq!(scope.device_id.as_deref(), Some("till-2"));
        assert!(scope.client_id.is_none());
    }
}
