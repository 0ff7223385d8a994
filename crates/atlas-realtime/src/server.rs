//! # Realtime Server Module
//!
//! The Axum router: WebSocket upgrade endpoints, REST fallbacks and the
//! health check, all delegating into the actor layer.
//!
//! ## Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Realtime Server (Axum)                           │
//! │                                                                         │
//! │  WS   /notifications/connect ──┐                                        │
//! │  WS   /inventory/sync        ──┤  drive_socket: one writer task,        │
//! │  WS   /pos/connect           ──┤  one ping task, one receive loop       │
//! │  WS   /warranty/connect      ──┘  per connection                        │
//! │                                                                         │
//! │  POST /notifications/broadcast ┐                                        │
//! │  POST /inventory/update        ├─ same actor operations, HTTP codes:    │
//! │  POST /pos/transaction         │  400 protocol / invalid_quantity       │
//! │  POST /warranty/event          ┘  404 not_found  409 conflict           │
//! │                                   500 persistence / internal            │
//! │                                                                         │
//! │  GET  /notifications/history      GET /inventory/{store_id}             │
//! │  GET  /pos/{store_id}/transactions  GET /warranty/schedule              │
//! │  GET  /health                                                           │
//! │                                                                         │
//! │  /inventory/sync and /pos/connect refuse the upgrade without a         │
//! │  storeId query parameter: every frame on them needs the store scope.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::actors::{
    InventoryActor, NotificationActor, TransactionActor, WarrantyActor, WsActor,
};
use crate::error::RealtimeError;
use crate::message::{TransactionAction, WarrantyEventData};
use crate::session::{SessionScope, SESSION_QUEUE_DEPTH};
use atlas_core::{InventoryAdjustment, WarrantyEventKind};
use atlas_db::Database;

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum inbound frame size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Application State
// =============================================================================

/// Shared server state: the database handle plus one of each actor.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub notifications: Arc<NotificationActor>,
    pub inventory: Arc<InventoryActor>,
    pub transactions: Arc<TransactionActor>,
    pub warranty: Arc<WarrantyActor>,
}

impl AppState {
    /// Wires every actor to the database.
    pub fn new(db: Database, warranty: Arc<WarrantyActor>, buffer_capacity: usize) -> Self {
        AppState {
            notifications: Arc::new(NotificationActor::new(&db, buffer_capacity)),
            inventory: Arc::new(InventoryActor::new(&db)),
            transactions: Arc::new(TransactionActor::new(&db)),
            warranty,
            db,
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notifications/connect", get(notifications_ws))
        .route("/notifications/broadcast", post(notifications_broadcast))
        .route("/notifications/history", get(notifications_history))
        .route("/inventory/sync", get(inventory_ws))
        .route("/inventory/update", post(inventory_update))
        .route("/inventory/{store_id}", get(inventory_snapshot))
        .route("/pos/connect", get(pos_ws))
        .route("/pos/transaction", post(pos_transaction))
        .route("/pos/{store_id}/transactions", get(pos_transactions))
        .route("/warranty/connect", get(warranty_ws))
        .route("/warranty/event", post(warranty_event))
        .route("/warranty/schedule", get(warranty_schedule))
        .with_state(state)
}

// =============================================================================
// Error Mapping
// =============================================================================

fn status_for(err: &RealtimeError) -> StatusCode {
    match err.wire_code() {
        "protocol" | "invalid_quantity" => StatusCode::BAD_REQUEST,
        "not_found" => StatusCode::NOT_FOUND,
        "conflict" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: RealtimeError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    (
        status,
        Json(json!({
            "success": false,
            "code": err.wire_code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<AppState>) -> Response {
    let database = state.db.health_check().await;
    let status = if database { "ok" } else { "degraded" };
    let code = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "database": database,
            "actors": {
                "notifications": { "sessions": state.notifications.session_count().await },
                "inventory": {
                    "sessions": state.inventory.session_count().await,
                    "stores": state.inventory.instance_count().await,
                },
                "pos": {
                    "sessions": state.transactions.session_count().await,
                    "stores": state.transactions.instance_count().await,
                },
                "warranty": { "sessions": state.warranty.session_count().await },
            },
        })),
    )
        .into_response()
}

// =============================================================================
// WebSocket Endpoints
// =============================================================================

async fn notifications_ws(
    ws: WebSocketUpgrade,
    Query(scope): Query<SessionScope>,
    State(state): State<AppState>,
) -> Response {
    upgrade(ws, scope, state.notifications.clone())
}

async fn inventory_ws(
    ws: WebSocketUpgrade,
    Query(scope): Query<SessionScope>,
    State(state): State<AppState>,
) -> Response {
    if scope.store_id.is_none() {
        return error_response(RealtimeError::MissingScope("storeId"));
    }
    upgrade(ws, scope, state.inventory.clone())
}

async fn pos_ws(
    ws: WebSocketUpgrade,
    Query(scope): Query<SessionScope>,
    State(state): State<AppState>,
) -> Response {
    if scope.store_id.is_none() {
        return error_response(RealtimeError::MissingScope("storeId"));
    }
    upgrade(ws, scope, state.transactions.clone())
}

async fn warranty_ws(
    ws: WebSocketUpgrade,
    Query(scope): Query<SessionScope>,
    State(state): State<AppState>,
) -> Response {
    upgrade(ws, scope, state.warranty.clone())
}

fn upgrade(ws: WebSocketUpgrade, scope: SessionScope, actor: Arc<dyn WsActor>) -> Response {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| drive_socket(socket, scope, actor))
}

/// Runs one WebSocket connection against its actor.
///
/// A writer task drains the session queue into the socket so broadcasts
/// (queued by other connections) and direct replies share one ordered
/// path. The receive loop itself never writes to the socket.
async fn drive_socket(socket: WebSocket, scope: SessionScope, actor: Arc<dyn WsActor>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(SESSION_QUEUE_DEPTH);

    let session_id = actor.connect(&scope, tx.clone()).await;
    info!(session_id = %session_id, store_id = ?scope.store_id, "Session connected");

    // Writer task: sole owner of the sink
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Ping task
    let ping_tx = tx.clone();
    let pinger = tokio::spawn(async move {
        let mut ticker = interval(PING_INTERVAL);
        loop {
            ticker.tick().await;
            if ping_tx
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Receive loop
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = actor.handle_text(&scope, text.as_str()).await;
                if tx.send(Message::Text(reply)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data)).await;
            }
            Ok(Message::Pong(_)) => {
                // Connection is alive
            }
            Ok(Message::Binary(_)) => {
                debug!(session_id = %session_id, "Ignoring binary frame");
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client requested close");
                break;
            }
            Err(e) => {
                warn!(session_id = %session_id, ?e, "WebSocket error");
                break;
            }
        }
    }

    pinger.abort();
    writer.abort();
    actor.disconnect(&scope, session_id).await;
    info!(session_id = %session_id, "Session closed");
}

// =============================================================================
// REST Endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct BroadcastRequest {
    content: String,
    sender: Option<String>,
}

async fn notifications_broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Response {
    match state.notifications.publish(req.content, req.sender).await {
        Ok(message) => Json(json!({ "success": true, "message": message })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn notifications_history(State(state): State<AppState>) -> Response {
    match state.notifications.history().await {
        Ok(messages) => Json(json!({ "success": true, "messages": messages })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryUpdateRequest {
    store_id: String,
    product_id: String,
    action: InventoryAdjustment,
    quantity: i64,
}

async fn inventory_update(
    State(state): State<AppState>,
    Json(req): Json<InventoryUpdateRequest>,
) -> Response {
    match state
        .inventory
        .apply_update(&req.store_id, &req.product_id, req.action, req.quantity)
        .await
    {
        Ok(record) => Json(json!({ "success": true, "record": record })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn inventory_snapshot(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Response {
    match state.inventory.snapshot(&store_id).await {
        Ok(records) => Json(json!({ "success": true, "records": records })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest {
    store_id: String,
    action: TransactionAction,
    transaction_id: String,
    payload: Option<serde_json::Value>,
}

async fn pos_transaction(
    State(state): State<AppState>,
    Json(req): Json<TransactionRequest>,
) -> Response {
    match state
        .transactions
        .apply_action(&req.store_id, req.action, &req.transaction_id, req.payload)
        .await
    {
        Ok(transaction) => {
            Json(json!({ "success": true, "transaction": transaction })).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn pos_transactions(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Response {
    match state.transactions.active(&store_id).await {
        Ok(transactions) => {
            Json(json!({ "success": true, "transactions": transactions })).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WarrantyEventRequest {
    event: WarrantyEventKind,
    registration_id: String,
    #[serde(default)]
    data: WarrantyEventData,
}

async fn warranty_event(
    State(state): State<AppState>,
    Json(req): Json<WarrantyEventRequest>,
) -> Response {
    match state
        .warranty
        .handle_event(req.event, &req.registration_id, req.data)
        .await
    {
        Ok(()) => Json(json!({
            "success": true,
            "registrationId": req.registration_id,
            "event": req.event,
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn warranty_schedule(State(state): State<AppState>) -> Response {
    match state.warranty.schedule().await {
        Ok(entries) => Json(json!({ "success": true, "entries": entries })).into_response(),
        Err(err) => error_response(err),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::LogDelivery;
    use atlas_db::DbConfig;

    async fn test_state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let warranty = Arc::new(WarrantyActor::new(&db, Arc::new(LogDelivery), 30));
        AppState::new(db, warranty, 100)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&RealtimeError::Protocol("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RealtimeError::MissingScope("storeId")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RealtimeError::Domain(
                atlas_core::CoreError::DuplicateTransaction { id: "t".into() }
            )),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&RealtimeError::Domain(
                atlas_core::CoreError::TransactionNotFound { id: "t".into() }
            )),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&RealtimeError::Persistence("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_router_builds() {
        let state = test_state().await;
        let _app = router(state);
    }
}
