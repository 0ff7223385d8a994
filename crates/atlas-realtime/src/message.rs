//! # Wire Envelopes
//!
//! Tagged JSON frames exchanged over the actor WebSocket endpoints.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Realtime Wire Protocol                             │
//! │                                                                         │
//! │  NOTIFICATIONS (/notifications/connect)                                │
//! │  ──────────────────────────────────────                                │
//! │  Client ───► { "type": "message", "content": "...", "sender": "..." }  │
//! │  Server ◄─── { "type": "ack", "id": "..." }              (reply)       │
//! │  Server ◄─── { "type": "message", id, sender, ... }      (broadcast)   │
//! │  Server ◄─── { "type": "history", "messages": [...] }    (on connect)  │
//! │                                                                         │
//! │  INVENTORY (/inventory/sync?storeId=…)                                 │
//! │  ─────────────────────────────────────                                 │
//! │  Client ───► { "type": "update", productId, action, quantity }         │
//! │  Server ◄─── { "type": "ack", "record": {...} }          (reply)       │
//! │  Server ◄─── { "type": "update", storeId, ... }          (store-wide)  │
//! │                                                                         │
//! │  POS (/pos/connect?storeId=…)                                          │
//! │  ────────────────────────────                                          │
//! │  Client ───► { "type": "transaction", action, transactionId, payload } │
//! │  Server ◄─── { "type": "ack", "transaction": {...} }     (reply)       │
//! │  Server ◄─── { "type": "transaction", storeId, ... }     (store-wide)  │
//! │                                                                         │
//! │  WARRANTY (/warranty/connect)                                          │
//! │  ────────────────────────────                                          │
//! │  Client ───► { "type": "warranty_event", event, registrationId, data } │
//! │  Server ◄─── { "type": "ack", registrationId, event }    (reply)       │
//! │  Server ◄─── { "type": "warranty_event", ... }           (broadcast)   │
//! │                                                                         │
//! │  KEEPALIVE + ERROR (all endpoints)                                     │
//! │  ─────────────────────────────────                                     │
//! │  Client ───► { "type": "ping" }                                        │
//! │  Server ◄─── { "type": "pong", "timestamp": "..." }                    │
//! │  Server ◄─── { "type": "error", "code": "...", "message": "..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Internally tagged JSON: the `type` field selects the variant, the
//! remaining fields sit beside it. Type names are snake_case, field
//! names camelCase. Unknown types fail decoding and produce an
//! `error` reply with code `protocol`.

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RealtimeError;
use atlas_core::{
    InventoryAdjustment, InventoryRecord, Transaction, TransactionStatus, WarrantyEventKind,
};

// =============================================================================
// Frame Helpers
// =============================================================================

/// Serializes an outbound message to a text frame payload.
///
/// Serialization of our own outbound enums cannot fail in practice;
/// if it somehow does, a literal `error` frame is produced instead so
/// the client always receives valid JSON.
pub fn to_frame<T: Serialize>(msg: &T) -> Utf8Bytes {
    match serde_json::to_string(msg) {
        Ok(json) => Utf8Bytes::from(json),
        Err(_) => Utf8Bytes::from_static(
            r#"{"type":"error","code":"internal","message":"serialization failed"}"#,
        ),
    }
}

/// Renders an error as an `error` reply frame.
pub fn error_frame(err: &RealtimeError) -> Utf8Bytes {
    to_frame(&ErrorReply {
        r#type: "error",
        code: err.wire_code(),
        message: err.to_string(),
    })
}

/// The `error` reply frame, shared by every endpoint.
#[derive(Debug, Serialize)]
struct ErrorReply {
    r#type: &'static str,
    code: &'static str,
    message: String,
}

// =============================================================================
// Notification Messages
// =============================================================================

/// A broadcast notification message (buffered for history replay).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastMessage {
    /// Server-assigned message ID (UUID v4).
    pub id: String,

    /// Sender display name ("anonymous" when omitted by the client).
    pub sender: String,

    /// Message body.
    pub content: String,

    /// Server-assigned timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Inbound frames on the notification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationInbound {
    /// Keepalive probe.
    Ping,

    /// Broadcast request.
    #[serde(rename_all = "camelCase")]
    Message {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
    },
}

/// Outbound frames on the notification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationOutbound {
    /// Keepalive response.
    Pong { timestamp: DateTime<Utc> },

    /// Reply to the sender: the message was accepted.
    Ack { id: String },

    /// Broadcast to every session.
    Message(BroadcastMessage),

    /// Recent history, replayed to a newly connected session.
    History { messages: Vec<BroadcastMessage> },
}

// =============================================================================
// Inventory Messages
// =============================================================================

/// Inbound frames on the inventory endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryInbound {
    /// Keepalive probe.
    Ping,

    /// Apply an adjustment to one product's stock level.
    #[serde(rename_all = "camelCase")]
    Update {
        product_id: String,
        action: InventoryAdjustment,
        quantity: i64,
    },
}

/// Outbound frames on the inventory endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryOutbound {
    /// Keepalive response.
    Pong { timestamp: DateTime<Utc> },

    /// Reply to the sender: the resulting record.
    Ack { record: InventoryRecord },

    /// Broadcast to the store's sessions. `quantity` is the resulting
    /// absolute stock level, not the requested delta.
    #[serde(rename_all = "camelCase")]
    Update {
        store_id: String,
        product_id: String,
        action: InventoryAdjustment,
        quantity: i64,
        updated_at: DateTime<Utc>,
    },
}

// =============================================================================
// POS Transaction Messages
// =============================================================================

/// Transaction lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    Create,
    Update,
    Complete,
    Cancel,
}

/// Inbound frames on the POS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionInbound {
    /// Keepalive probe.
    Ping,

    /// Transaction lifecycle request.
    #[serde(rename_all = "camelCase")]
    Transaction {
        action: TransactionAction,
        transaction_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

/// Outbound frames on the POS endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionOutbound {
    /// Keepalive response.
    Pong { timestamp: DateTime<Utc> },

    /// Reply to the sender: the transaction snapshot after the action.
    Ack { transaction: Transaction },

    /// Broadcast to the store's sessions.
    #[serde(rename_all = "camelCase")]
    Transaction {
        store_id: String,
        transaction_id: String,
        status: TransactionStatus,
        payload: Value,
        updated_at: DateTime<Utc>,
    },
}

// =============================================================================
// Warranty Messages
// =============================================================================

/// Optional details carried by a warranty event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyEventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Inbound frames on the warranty endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarrantyInbound {
    /// Keepalive probe.
    Ping,

    /// Warranty lifecycle event.
    #[serde(rename_all = "camelCase")]
    WarrantyEvent {
        event: WarrantyEventKind,
        registration_id: String,
        #[serde(default)]
        data: WarrantyEventData,
    },
}

/// Outbound frames on the warranty endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarrantyOutbound {
    /// Keepalive response.
    Pong { timestamp: DateTime<Utc> },

    /// Reply to the sender: the event was recorded.
    #[serde(rename_all = "camelCase")]
    Ack {
        registration_id: String,
        event: WarrantyEventKind,
    },

    /// Broadcast to every session.
    #[serde(rename_all = "camelCase")]
    WarrantyEvent {
        event: WarrantyEventKind,
        registration_id: String,
        data: WarrantyEventData,
        timestamp: DateTime<Utc>,
    },
}

// =============================================================================
// Unit Tests
// =============================================================================
