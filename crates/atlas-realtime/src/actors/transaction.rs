//! # POS Transaction Actor
//!
//! Per-store active transaction set with lifecycle broadcasts.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    POS Transaction Actor                                │
//! │                                                                         │
//! │  create ──► active set        (duplicate id → conflict, untouched)     │
//! │  update ──► shallow payload merge (absent id → not_found)              │
//! │  complete │ cancel ──► REMOVED from the active set; the terminal       │
//! │                        snapshot is broadcast once, then the id is      │
//! │                        free for reuse                                  │
//! │                                                                         │
//! │  Every action broadcasts { storeId, transactionId, status, payload }   │
//! │  to the store's sessions and acks the sender with the snapshot.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::actors::WsActor;
use crate::error::{RealtimeError, RealtimeResult};
use crate::message::{
    error_frame, to_frame, TransactionAction, TransactionInbound, TransactionOutbound,
};
use crate::runtime::{ActorCell, ActorHost};
use crate::session::{SessionId, SessionScope};
use atlas_core::{Transaction, TransactionLedger};
use atlas_db::Database;

/// Per-store POS transaction actor.
pub struct TransactionActor {
    host: ActorHost<TransactionLedger>,
}

impl TransactionActor {
    pub fn new(db: &Database) -> Self {
        TransactionActor {
            host: ActorHost::new("pos", db.actor_state(), TransactionLedger::default),
        }
    }

    async fn cell(&self, store_id: &str) -> Arc<ActorCell<TransactionLedger>> {
        self.host.instance(store_id).await
    }

    /// Applies one lifecycle action: transform, persist, broadcast.
    ///
    /// Shared by the WS path and `POST /pos/transaction`.
    pub async fn apply_action(
        &self,
        store_id: &str,
        action: TransactionAction,
        transaction_id: &str,
        payload: Option<Value>,
    ) -> RealtimeResult<Transaction> {
        let cell = self.cell(store_id).await;
        let mut state = cell.state().await?;
        let now = Utc::now();
        let payload = payload.unwrap_or_else(|| Value::Object(Default::default()));

        let transaction = match action {
            TransactionAction::Create => state.create(store_id, transaction_id, payload, now)?,
            TransactionAction::Update => state.update(transaction_id, payload, now)?,
            TransactionAction::Complete => state.complete(transaction_id, now)?,
            TransactionAction::Cancel => state.cancel(transaction_id, now)?,
        };

        cell.persist(&state).await?;

        cell.broadcaster()
            .broadcast(to_frame(&TransactionOutbound::Transaction {
                store_id: transaction.store_id.clone(),
                transaction_id: transaction.id.clone(),
                status: transaction.status,
                payload: transaction.payload.clone(),
                updated_at: transaction.updated_at,
            }))
            .await;

        Ok(transaction)
    }

    /// Snapshot of a store's active transactions (read endpoint).
    pub async fn active(&self, store_id: &str) -> RealtimeResult<Vec<Transaction>> {
        let cell = self.cell(store_id).await;
        cell.with_state(|ledger| ledger.active()).await
    }

    /// Connected session count across all stores (health endpoint).
    pub async fn session_count(&self) -> usize {
        self.host.session_count().await
    }

    /// Live store instance count (health endpoint).
    pub async fn instance_count(&self) -> usize {
        self.host.len().await
    }
}

#[async_trait]
impl WsActor for TransactionActor {
    async fn connect(&self, scope: &SessionScope, sender: mpsc::Sender<Message>) -> SessionId {
        let store_id = scope.store_id.as_deref().unwrap_or("unscoped");
        let cell = self.cell(store_id).await;
        cell.sessions().register(scope.clone(), sender).await
    }

    async fn handle_text(&self, scope: &SessionScope, text: &str) -> Utf8Bytes {
        let Some(store_id) = scope.store_id.as_deref() else {
            return error_frame(&RealtimeError::MissingScope("storeId"));
        };

        let inbound: TransactionInbound = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(err) => return error_frame(&RealtimeError::Protocol(err.to_string())),
        };

        match inbound {
            TransactionInbound::Ping => to_frame(&TransactionOutbound::Pong {
                timestamp: Utc::now(),
            }),
            TransactionInbound::Transaction {
                action,
                transaction_id,
                payload,
            } => match self
                .apply_action(store_id, action, &transaction_id, payload)
                .await
            {
                Ok(transaction) => to_frame(&TransactionOutbound::Ack { transaction }),
                Err(err) => {
                    if !err.is_conflict() && !err.is_protocol_error() {
                        warn!(store_id = %store_id, error = %err, "Transaction action failed");
                    }
                    error_frame(&err)
                }
            },
        }
    }

    async fn disconnect(&self, scope: &SessionScope, session_id: SessionId) {
        let store_id = scope.store_id.as_deref().unwrap_or("unscoped");
        self.cell(store_id)
            .await
            .sessions()
            .unregister(session_id)
            .await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SESSION_QUEUE_DEPTH;
    use atlas_core::TransactionStatus;
    use atlas_db::DbConfig;
    use serde_json::json;

    fn scope(store: &str) -> SessionScope {
        SessionScope {
            store_id: Some(store.to_string()),
            ..Default::default()
        }
    }

    async fn actor() -> (Database, TransactionActor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = TransactionActor::new(&db);
        (db, actor)
    }

    #[tokio::test]
    async fn test_duplicate_create_is_conflict() {
        let (_db, actor) = actor().await;

        actor
            .apply_action("store-1", TransactionAction::Create, "t-1", None)
            .await
            .unwrap();

        let err = actor
            .apply_action(
                "store-1",
                TransactionAction::Create,
                "t-1",
                Some(json!({"total": 99})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.wire_code(), "conflict");

        // The original transaction is untouched
        let active = actor.active("store-1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].payload, json!({}));
    }

    #[tokio::test]
    async fn test_update_merges_payload() {
        let (_db, actor) = actor().await;

        actor
            .apply_action(
                "store-1",
                TransactionAction::Create,
                "t-1",
                Some(json!({"total": 10, "items": 1})),
            )
            .await
            .unwrap();

        let updated = actor
            .apply_action(
                "store-1",
                TransactionAction::Update,
                "t-1",
                Some(json!({"total": 25})),
            )
            .await
            .unwrap();

        assert_eq!(updated.payload["total"], 25);
        assert_eq!(updated.payload["items"], 1);
    }

    #[tokio::test]
    async fn test_complete_removes_and_broadcasts_terminal_snapshot() {
        let (_db, actor) = actor().await;

        let (tx, mut rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
        actor.connect(&scope("store-1"), tx).await;

        actor
            .apply_action("store-1", TransactionAction::Create, "t-1", None)
            .await
            .unwrap();
        rx.recv().await; // create broadcast

        let completed = actor
            .apply_action("store-1", TransactionAction::Complete, "t-1", None)
            .await
            .unwrap();
        assert_eq!(completed.status, TransactionStatus::Completed);
        assert!(actor.active("store-1").await.unwrap().is_empty());

        let Some(Message::Text(frame)) = rx.recv().await else {
            panic!("expected terminal broadcast");
        };
        let json: Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["transactionId"], "t-1");
    }

    #[tokio::test]
    async fn test_update_after_complete_is_not_found() {
        let (_db, actor) = actor().await;

        actor
            .apply_action("store-1", TransactionAction::Create, "t-1", None)
            .await
            .unwrap();
        actor
            .apply_action("store-1", TransactionAction::Complete, "t-1", None)
            .await
            .unwrap();

        let err = actor
            .apply_action(
                "store-1",
                TransactionAction::Update,
                "t-1",
                Some(json!({"total": 5})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.wire_code(), "not_found");
    }

    #[tokio::test]
    async fn test_terminal_id_is_reusable() {
        let (_db, actor) = actor().await;

        actor
            .apply_action("store-1", TransactionAction::Create, "t-1", None)
            .await
            .unwrap();
        actor
            .apply_action("store-1", TransactionAction::Cancel, "t-1", None)
            .await
            .unwrap();

        // The id left the active set; a fresh create succeeds
        let recreated = actor
            .apply_action("store-1", TransactionAction::Create, "t-1", None)
            .await
            .unwrap();
        assert_eq!(recreated.status, TransactionStatus::Active);
    }

    #[tokio::test]
    async fn test_active_set_survives_restart() {
        let (db, actor) = actor().await;

        actor
            .apply_action(
                "store-1",
                TransactionAction::Create,
                "t-1",
                Some(json!({"total": 12})),
            )
            .await
            .unwrap();

        let restarted = TransactionActor::new(&db);
        let active = restarted.active("store-1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].payload["total"], 12);
    }
}
