//! # Notification Actor
//!
//! Global broadcast channel with a replayable history buffer.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Notification Actor                                 │
//! │                                                                         │
//! │  { "type": "message", "content": "...", "sender": "till-3" }           │
//! │       │                                                                 │
//! │       ▼  (gate held for the whole sequence)                             │
//! │  1. assign id + timestamp                                              │
//! │  2. push into the ring buffer (oldest evicted at capacity)             │
//! │  3. persist the buffer                                                 │
//! │  4. broadcast to EVERY session                                         │
//! │  5. ack the sender                                                     │
//! │                                                                         │
//! │  New connection ──► history { messages } replayed from the buffer      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::actors::WsActor;
use crate::error::{RealtimeError, RealtimeResult};
use crate::message::{to_frame, error_frame, BroadcastMessage, NotificationInbound, NotificationOutbound};
use crate::runtime::{ActorCell, ActorHost};
use crate::session::{SessionId, SessionScope};
use atlas_core::MessageBuffer;
use atlas_db::Database;

/// The single instance key: notifications are store-agnostic.
const GLOBAL_KEY: &str = "global";

/// Global notification broadcast actor.
pub struct NotificationActor {
    host: ActorHost<MessageBuffer<BroadcastMessage>>,
}

impl NotificationActor {
    /// Creates the actor with the configured history capacity.
    pub fn new(db: &Database, buffer_capacity: usize) -> Self {
        NotificationActor {
            host: ActorHost::new("notifications", db.actor_state(), move || {
                MessageBuffer::new(buffer_capacity)
            }),
        }
    }

    async fn cell(&self) -> Arc<ActorCell<MessageBuffer<BroadcastMessage>>> {
        self.host.instance(GLOBAL_KEY).await
    }

    /// Appends a message, persists the buffer and broadcasts it.
    ///
    /// Shared by the WS path and `POST /notifications/broadcast`.
    pub async fn publish(
        &self,
        content: String,
        sender: Option<String>,
    ) -> RealtimeResult<BroadcastMessage> {
        let cell = self.cell().await;
        let mut state = cell.state().await?;

        let message = BroadcastMessage {
            id: Uuid::new_v4().to_string(),
            sender: sender.unwrap_or_else(|| "anonymous".to_string()),
            content,
            timestamp: Utc::now(),
        };

        state.push(message.clone());
        cell.persist(&state).await?;

        cell.broadcaster()
            .broadcast(to_frame(&NotificationOutbound::Message(message.clone())))
            .await;

        Ok(message)
    }

    /// Recent history, oldest first.
    pub async fn history(&self) -> RealtimeResult<Vec<BroadcastMessage>> {
        let cell = self.cell().await;
        cell.with_state(|buffer| buffer.iter().cloned().collect())
            .await
    }

    /// Connected session count (health endpoint).
    pub async fn session_count(&self) -> usize {
        self.host.session_count().await
    }
}

#[async_trait]
impl WsActor for NotificationActor {
    async fn connect(&self, scope: &SessionScope, sender: mpsc::Sender<Message>) -> SessionId {
        let cell = self.cell().await;
        let session_id = cell.sessions().register(scope.clone(), sender).await;

        // Replay recent history as a single frame. A read failure only
        // costs the replay, never the connection.
        match cell
            .with_state(|buffer| buffer.iter().cloned().collect::<Vec<_>>())
            .await
        {
            Ok(messages) => {
                cell.broadcaster()
                    .send_to(
                        session_id,
                        to_frame(&NotificationOutbound::History { messages }),
                    )
                    .await;
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "History replay failed");
            }
        }

        session_id
    }

    async fn handle_text(&self, _scope: &SessionScope, text: &str) -> Utf8Bytes {
        let inbound: NotificationInbound = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(err) => return error_frame(&RealtimeError::Protocol(err.to_string())),
        };

        match inbound {
            NotificationInbound::Ping => to_frame(&NotificationOutbound::Pong {
                timestamp: Utc::now(),
            }),
            NotificationInbound::Message { content, sender } => {
                match self.publish(content, sender).await {
                    Ok(message) => to_frame(&NotificationOutbound::Ack { id: message.id }),
                    Err(err) => {
                        warn!(error = %err, "Notification publish failed");
                        error_frame(&err)
                    }
                }
            }
        }
    }

    async fn disconnect(&self, _scope: &SessionScope, session_id: SessionId) {
        self.cell().await.sessions().unregister(session_id).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
