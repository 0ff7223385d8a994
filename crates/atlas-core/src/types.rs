//! # Domain Types
//!
//! Core domain types used throughout the Atlas realtime subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryRecord │   │   Transaction   │   │  ScheduleEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  store_id       │   │  id             │   │  registration_id│       │
//! │  │  product_id     │   │  store_id       │   │  kind           │       │
//! │  │  quantity (>=0) │   │  status         │   │  scheduled_at   │       │
//! │  │  updated_at     │   │  payload (JSON) │   │  recipient      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌───────────────────┐ ┌──────────────────┐ ┌─────────────────┐        │
//! │  │InventoryAdjustment│ │TransactionStatus │ │WarrantyEventKind│        │
//! │  │  Add              │ │  Active          │ │  Registered     │        │
//! │  │  Subtract         │ │  Completed ✕     │ │  Expiring       │        │
//! │  │  Set              │ │  Cancelled ✕     │ │  Expired        │        │
//! │  │                   │ │  (✕ = terminal)  │ │  Claim*         │        │
//! │  └───────────────────┘ └──────────────────┘ └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Composite-Key Identity Pattern
//! Realtime records are identified by composite keys that mirror the actor
//! partitioning: `storeId:productId`, `storeId:transactionId`,
//! `registrationId:notificationType`. The `key()` methods render them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Inventory
// =============================================================================

/// How an inventory mutation is applied to the current quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAdjustment {
    /// Add the requested quantity (restock).
    Add,

    /// Subtract the requested quantity, flooring the result at zero.
    Subtract,

    /// Replace the quantity outright, clamped to a zero minimum.
    Set,
}

impl std::fmt::Display for InventoryAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryAdjustment::Add => write!(f, "add"),
            InventoryAdjustment::Subtract => write!(f, "subtract"),
            InventoryAdjustment::Set => write!(f, "set"),
        }
    }
}

impl std::str::FromStr for InventoryAdjustment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(InventoryAdjustment::Add),
            "subtract" => Ok(InventoryAdjustment::Subtract),
            "set" => Ok(InventoryAdjustment::Set),
            other => Err(CoreError::invalid_payload(format!(
                "Unknown inventory action: '{}'. Valid options: add, subtract, set",
                other
            ))),
        }
    }
}

/// A per-(store, product) stock record.
///
/// Created on first mutation; the quantity is always >= 0 (subtraction
/// floors, `set` clamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    /// Store this record belongs to (actor key).
    pub store_id: String,

    /// Product identifier within the store.
    pub product_id: String,

    /// Current quantity on hand. Never negative.
    pub quantity: i64,

    /// When the record was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Returns the composite record key, `storeId:productId`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.store_id, self.product_id)
    }
}

// =============================================================================
// POS Transactions
// =============================================================================

/// Lifecycle status of a POS transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Open and accepting updates.
    Active,

    /// Finalized successfully. Terminal.
    Completed,

    /// Abandoned by the register. Terminal.
    Cancelled,
}

impl TransactionStatus {
    /// Returns true for states that remove the transaction from the
    /// active set.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Active => write!(f, "active"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A short-lived POS transaction owned by one store's actor instance.
///
/// The `payload` is a free-form JSON object owned by the register (line
/// items, tender details); `update` shallow-merges incoming top-level keys
/// over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Register-assigned transaction identifier.
    pub id: String,

    /// Store this transaction belongs to (actor key).
    pub store_id: String,

    /// Current lifecycle status.
    pub status: TransactionStatus,

    /// Free-form register payload, shallow-merged on update.
    pub payload: serde_json::Value,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the composite key, `storeId:transactionId`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.store_id, self.id)
    }
}

// =============================================================================
// Warranty Events
// =============================================================================

/// Domain events in a warranty registration's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyEventKind {
    /// A warranty was registered for a purchase.
    Registered,

    /// The warranty is inside the reminder window.
    Expiring,

    /// The warranty has passed its expiry date.
    Expired,

    /// A claim was opened against the warranty.
    ClaimCreated,

    /// An open claim was updated.
    ClaimUpdated,
}

impl WarrantyEventKind {
    /// Stable string form used for audit rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyEventKind::Registered => "registered",
            WarrantyEventKind::Expiring => "expiring",
            WarrantyEventKind::Expired => "expired",
            WarrantyEventKind::ClaimCreated => "claim_created",
            WarrantyEventKind::ClaimUpdated => "claim_updated",
        }
    }
}

impl std::fmt::Display for WarrantyEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WarrantyEventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "registered" => Ok(WarrantyEventKind::Registered),
            "expiring" => Ok(WarrantyEventKind::Expiring),
            "expired" => Ok(WarrantyEventKind::Expired),
            "claim_created" => Ok(WarrantyEventKind::ClaimCreated),
            "claim_updated" => Ok(WarrantyEventKind::ClaimUpdated),
            other => Err(CoreError::invalid_payload(format!(
                "Unknown warranty event: '{}'",
                other
            ))),
        }
    }
}

/// A warranty registration as stored in the relational database.
///
/// This is the scan input for the expiry scheduler: every registration
/// whose `expiry_date` falls inside the reminder window produces a
/// schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WarrantyRegistration {
    /// Registration identifier (client-assigned).
    pub id: String,

    /// Customer display name, if provided.
    pub customer_name: Option<String>,

    /// Customer contact address - the notification recipient.
    pub customer_email: String,

    /// Product display name, if provided.
    pub product_name: Option<String>,

    /// When the warranty expires.
    pub expiry_date: DateTime<Utc>,

    /// When the registration row was created.
    pub created_at: DateTime<Utc>,

    /// When the registration row was last updated.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// The kind of scheduled notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Reminder that the warranty expires soon.
    WarrantyExpiring,

    /// Notice that the warranty has expired.
    WarrantyExpired,
}

impl NotificationKind {
    /// Stable string form used for schedule keys and database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::WarrantyExpiring => "warranty_expiring",
            NotificationKind::WarrantyExpired => "warranty_expired",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Recorded, delivery not yet attempted (or attempt in flight).
    Pending,

    /// Handed to the delivery mechanism successfully.
    Sent,

    /// Delivery attempt failed; the schedule entry stays for retry.
    Failed,
}

impl NotificationStatus {
    /// Stable string form used for database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound notification as recorded in the relational database.
///
/// Inserted as `pending` BEFORE the delivery attempt so a crash
/// mid-dispatch never loses the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Notification identifier (UUID v4).
    pub id: String,

    /// Registration this notification belongs to.
    pub registration_id: String,

    /// What kind of notification this is.
    pub notification_type: NotificationKind,

    /// Delivery address.
    pub recipient: String,

    /// Rendered subject line.
    pub subject: String,

    /// Rendered body text.
    pub body: String,

    /// Current delivery status.
    pub status: NotificationStatus,

    /// Last delivery error, if any.
    pub last_error: Option<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When delivery succeeded, if it has.
    pub sent_at: Option<DateTime<Utc>>,
}

/// A pending future notification in an actor's schedule.
///
/// Keyed by `registrationId:kind`; removed in the same step that marks it
/// dispatched, so a given entry is sent at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Registration this entry reminds about.
    pub registration_id: String,

    /// What kind of notification to send.
    pub kind: NotificationKind,

    /// When the entry becomes due.
    pub scheduled_at: DateTime<Utc>,

    /// Delivery address.
    pub recipient: String,

    /// Customer display name for rendering, if known.
    pub customer_name: Option<String>,

    /// Product display name for rendering, if known.
    pub product_name: Option<String>,

    /// The warranty's expiry date, for rendering.
    pub expiry_date: DateTime<Utc>,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Returns the dedup key, `registrationId:kind`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.registration_id, self.kind.as_str())
    }

    /// Renders the schedule key for a (registration, kind) pair without
    /// an entry in hand.
    pub fn key_for(registration_id: &str, kind: NotificationKind) -> String {
        format!("{}:{}", registration_id, kind.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_adjustment_parsing() {
        assert_eq!(
            "add".parse::<InventoryAdjustment>().unwrap(),
            InventoryAdjustment::Add
        );
        assert_eq!(
            "SET".parse::<InventoryAdjustment>().unwrap(),
            InventoryAdjustment::Set
        );
        assert!("increment".parse::<InventoryAdjustment>().is_err());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Active.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_composite_keys() {
        let record = InventoryRecord {
            store_id: "store-1".into(),
            product_id: "42".into(),
            quantity: 7,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(record.key(), "store-1:42");

        assert_eq!(
            ScheduleEntry::key_for("reg-9", NotificationKind::WarrantyExpiring),
            "reg-9:warranty_expiring"
        );
    }

    #[test]
    fn test_wire_serialization_is_camel_case() {
        let record = InventoryRecord {
            store_id: "s1".into(),
            product_id: "p1".into(),
            quantity: 3,
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"storeId\""));
        assert!(json.contains("\"productId\""));
        assert!(json.contains("\"updatedAt\""));
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [
            WarrantyEventKind::Registered,
            WarrantyEventKind::Expiring,
            WarrantyEventKind::Expired,
            WarrantyEventKind::ClaimCreated,
            WarrantyEventKind::ClaimUpdated,
        ] {
            let parsed: WarrantyEventKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
