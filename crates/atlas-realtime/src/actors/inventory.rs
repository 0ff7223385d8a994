//! # Inventory Actor
//!
//! Per-store stock ledger with store-scoped broadcasts.
//!
//! ## Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Inventory Actor                                  │
//! │                                                                         │
//! │  /inventory/sync?storeId=store-1                                       │
//! │  { "type": "update", "productId": "sku-1", "action": "subtract",       │
//! │    "quantity": 5 }                                                     │
//! │       │                                                                 │
//! │       ▼  instance "store-1" (gate held)                                 │
//! │  1. ledger apply: clamped fold, stock never below zero                 │
//! │  2. persist the ledger                                                 │
//! │  3. broadcast the resulting ABSOLUTE quantity to the store's sessions  │
//! │  4. ack { record } to the sender                                       │
//! │                                                                         │
//! │  store-2 sessions live in a different cell - they hear nothing.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::actors::WsActor;
use crate::error::{RealtimeError, RealtimeResult};
use crate::message::{error_frame, to_frame, InventoryInbound, InventoryOutbound};
use crate::runtime::{ActorCell, ActorHost};
use crate::session::{SessionId, SessionScope};
use atlas_core::{InventoryAdjustment, InventoryLedger, InventoryRecord};
use atlas_db::Database;

/// Fallback key when a frame arrives without a store scope. The
/// handshake rejects scopeless connects, so this only guards the
/// protocol path.
fn store_key(scope: &SessionScope) -> Option<&str> {
    scope.store_id.as_deref()
}

/// Per-store inventory ledger actor.
pub struct InventoryActor {
    host: ActorHost<InventoryLedger>,
}

impl InventoryActor {
    pub fn new(db: &Database) -> Self {
        InventoryActor {
            host: ActorHost::new("inventory", db.actor_state(), InventoryLedger::default),
        }
    }

    async fn cell(&self, store_id: &str) -> Arc<ActorCell<InventoryLedger>> {
        self.host.instance(store_id).await
    }

    /// Applies one adjustment: fold, persist, broadcast.
    ///
    /// Shared by the WS path and `POST /inventory/update`.
    pub async fn apply_update(
        &self,
        store_id: &str,
        product_id: &str,
        action: InventoryAdjustment,
        quantity: i64,
    ) -> RealtimeResult<InventoryRecord> {
        let cell = self.cell(store_id).await;
        let mut state = cell.state().await?;

        let record = state.apply(store_id, product_id, action, quantity, Utc::now())?;
        cell.persist(&state).await?;

        // The cell's registry only holds this store's sessions, so a
        // plain broadcast is already store-scoped.
        cell.broadcaster()
            .broadcast(to_frame(&InventoryOutbound::Update {
                store_id: record.store_id.clone(),
                product_id: record.product_id.clone(),
                action,
                quantity: record.quantity,
                updated_at: record.updated_at,
            }))
            .await;

        Ok(record)
    }

    /// Snapshot of a store's ledger (read endpoint).
    pub async fn snapshot(&self, store_id: &str) -> RealtimeResult<Vec<InventoryRecord>> {
        let cell = self.cell(store_id).await;
        cell.with_state(|ledger| ledger.records()).await
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
impl WsActor for InventoryActor {
    async fn connect(&self, scope: &SessionScope, sender: mpsc::Sender<Message>) -> SessionId {
        // The handshake guarantees a store id at this point
        let store_id = scope.store_id.as_deref().unwrap_or("unscoped");
        let cell = self.cell(store_id).await;
        cell.sessions().register(scope.clone(), sender).await
    }

    async fn handle_text(&self, scope: &SessionScope, text: &str) -> Utf8Bytes {
        let Some(store_id) = store_key(scope) else {
            return error_frame(&RealtimeError::MissingScope("storeId"));
        };

        let inbound: InventoryInbound = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(err) => return error_frame(&RealtimeError::Protocol(err.to_string())),
        };

        match inbound {
            InventoryInbound::Ping => to_frame(&InventoryOutbound::Pong {
                timestamp: Utc::now(),
            }),
            InventoryInbound::Update {
                product_id,
                action,
                quantity,
            } => match self
                .apply_update(store_id, &product_id, action, quantity)
                .await
            {
                Ok(record) => to_frame(&InventoryOutbound::Ack { record }),
                Err(err) => {
                    if !err.is_protocol_error() {
                        warn!(store_id = %store_id, error = %err, "Inventory update failed");
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
    use atlas_db::DbConfig;
    use serde_json::Value;

    fn scope(store: &str) -> SessionScope {
        SessionScope {
            store_id: Some(store.to_string()),
            ..Default::default()
        }
    }

    async fn actor() -> (Database, InventoryActor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = InventoryActor::new(&db);
        (db, actor)
    }

    #[tokio::test]
    async fn test_clamped_fold_sequence() {
        let (_db, actor) = actor().await;

        // Absent record: add 10 → 10
        let r = actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Add, 10)
            .await
            .unwrap();
        assert_eq!(r.quantity, 10);

        // Subtract 15 clamps to 0
        let r = actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Subtract, 15)
            .await
            .unwrap();
        assert_eq!(r.quantity, 0);

        // Set 7 → 7
        let r = actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Set, 7)
            .await
            .unwrap();
        assert_eq!(r.quantity, 7);
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected_without_state_change() {
        let (_db, actor) = actor().await;

        actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Add, 10)
            .await
            .unwrap();

        let err = actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Add, -5)
            .await
            .unwrap_err();
        assert_eq!(err.wire_code(), "invalid_quantity");

        let snapshot = actor.snapshot("store-1").await.unwrap();
        assert_eq!(snapshot[0].quantity, 10);
    }

    #[tokio::test]
    async fn test_broadcast_scoped_to_store() {
        let (_db, actor) = actor().await;

        let (tx1, mut rx1) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let (tx2, mut rx2) = mpsc::channel(SESSION_QUEUE_DEPTH);
        actor.connect(&scope("store-1"), tx1).await;
        actor.connect(&scope("store-2"), tx2).await;

        actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Add, 10)
            .await
            .unwrap();

        let Some(Message::Text(frame)) = rx1.recv().await else {
            panic!("expected update broadcast");
        };
        let json: Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["storeId"], "store-1");
        assert_eq!(json["quantity"], 10);

        // store-2 stays silent
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ledger_survives_restart() {
        let (db, actor) = actor().await;

        actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Set, 42)
            .await
            .unwrap();

        let restarted = InventoryActor::new(&db);
        let snapshot = restarted.snapshot("store-1").await.unwrap();
        assert_eq!(snapshot[0].quantity, 42);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let (_db, actor) = actor().await;

        actor
            .apply_update("store-1", "sku-1", InventoryAdjustment::Add, 5)
            .await
            .unwrap();

        assert!(actor.snapshot("store-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_text_update() {
        let (_db, actor) = actor().await;

        let reply = actor
            .handle_text(
                &scope("store-1"),
                r#"{"type":"update","productId":"sku-9","action":"add","quantity":3}"#,
            )
            .await;
        let json: Value = serde_json::from_str(reply.as_str()).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["record"]["quantity"], 3);
    }
}
