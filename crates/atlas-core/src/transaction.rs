//! # Transaction Ledger
//!
//! The active-transaction set behind the POS-transaction actor.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    POS Transaction Lifecycle                            │
//! │                                                                         │
//! │            create                 complete                              │
//! │    ∅ ───────────────► active ───────────────► completed (terminal)     │
//! │                        │   ▲                                            │
//! │                 update │   │ (payload merge)                            │
//! │                        └───┘                                            │
//! │                        │          cancel                                │
//! │                        └────────────────────► cancelled (terminal)      │
//! │                                                                         │
//! │  create on existing key     → DuplicateTransaction, no state change    │
//! │  update/complete/cancel     → TransactionNotFound,   no state change   │
//! │    on absent key                                                        │
//! │  terminal transition        → removed from the active set; the         │
//! │                               terminal snapshot is returned for        │
//! │                               broadcasting                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::types::{Transaction, TransactionStatus};

/// Active-transaction set for one store.
///
/// Only ACTIVE transactions live here; a terminal transition removes the
/// transaction and hands back its final snapshot. A terminal ID may later
/// be reused by a fresh `create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionLedger {
    active: BTreeMap<String, Transaction>,
}

impl TransactionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new transaction.
    ///
    /// Rejects a duplicate ID with `DuplicateTransaction` and leaves the
    /// existing transaction untouched.
    pub fn create(
        &mut self,
        store_id: &str,
        id: &str,
        payload: Value,
        now: DateTime<Utc>,
    ) -> CoreResult<Transaction> {
        if self.active.contains_key(id) {
            return Err(CoreError::DuplicateTransaction { id: id.to_string() });
        }

        let transaction = Transaction {
            id: id.to_string(),
            store_id: store_id.to_string(),
            status: TransactionStatus::Active,
            payload,
            created_at: now,
            updated_at: now,
        };
        self.active.insert(id.to_string(), transaction.clone());
        Ok(transaction)
    }

    /// Shallow-merges a payload into an active transaction.
    ///
    /// Incoming top-level keys overwrite existing ones; a non-object
    /// payload replaces the stored payload outright.
    pub fn update(&mut self, id: &str, payload: Value, now: DateTime<Utc>) -> CoreResult<Transaction> {
        let transaction = self
            .active
            .get_mut(id)
            .ok_or_else(|| CoreError::TransactionNotFound { id: id.to_string() })?;

        merge_payload(&mut transaction.payload, payload);
        transaction.updated_at = now;
        Ok(transaction.clone())
    }

    /// Completes an active transaction, removing it from the set.
    pub fn complete(&mut self, id: &str, now: DateTime<Utc>) -> CoreResult<Transaction> {
        self.finish(id, TransactionStatus::Completed, now)
    }

    /// Cancels an active transaction, removing it from the set.
    pub fn cancel(&mut self, id: &str, now: DateTime<Utc>) -> CoreResult<Transaction> {
        self.finish(id, TransactionStatus::Cancelled, now)
    }

    fn finish(
        &mut self,
        id: &str,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> CoreResult<Transaction> {
        let mut transaction = self
            .active
            .remove(id)
            .ok_or_else(|| CoreError::TransactionNotFound { id: id.to_string() })?;

        transaction.status = status;
        transaction.updated_at = now;
        Ok(transaction)
    }

    /// Looks up one active transaction.
    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.active.get(id)
    }

    /// All active transactions, in ID order.
    pub fn active(&self) -> Vec<Transaction> {
        self.active.values().cloned().collect()
    }

    /// Number of active transactions.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// True if no transactions are active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Shallow merge: incoming top-level keys overwrite; non-object payloads
/// replace the base outright.
fn merge_payload(base: &mut Value, incoming: Value) {
    match incoming {
        Value::Object(incoming_map) => match base {
            Value::Object(base_map) => {
                for (key, value) in incoming_map {
                    base_map.insert(key, value);
                }
            }
            _ => *base = Value::Object(incoming_map),
        },
        other => *base = other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 14, minute, 0).unwrap()
    }

    #[test]
    fn test_create_and_duplicate_rejected() {
        let mut ledger = TransactionLedger::new();
        let tx = ledger
            .create("1", "T1", json!({"items": 2}), at(0))
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Active);

        let err = ledger.create("1", "T1", json!({}), at(1)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTransaction { .. }));

        // First transaction untouched.
        assert_eq!(ledger.get("T1").unwrap().payload, json!({"items": 2}));
        assert_eq!(ledger.get("T1").unwrap().updated_at, at(0));
    }

    #[test]
    fn test_update_merges_top_level_keys() {
        let mut ledger = TransactionLedger::new();
        ledger
            .create("1", "T1", json!({"items": 2, "note": "a"}), at(0))
            .unwrap();

        let tx = ledger
            .update("T1", json!({"items": 3, "tender": "cash"}), at(1))
            .unwrap();
        assert_eq!(
            tx.payload,
            json!({"items": 3, "note": "a", "tender": "cash"})
        );
        assert_eq!(tx.updated_at, at(1));
    }

    #[test]
    fn test_update_absent_rejected() {
        let mut ledger = TransactionLedger::new();
        let err = ledger.update("nope", json!({}), at(0)).unwrap_err();
        assert!(matches!(err, CoreError::TransactionNotFound { .. }));
    }

    #[test]
    fn test_complete_removes_and_returns_terminal_snapshot() {
        let mut ledger = TransactionLedger::new();
        ledger.create("1", "T1", json!({"total": 900}), at(0)).unwrap();

        let tx = ledger.complete("T1", at(2)).unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.payload, json!({"total": 900}));
        assert!(ledger.is_empty());

        // Further operations on the removed ID are not-found.
        let err = ledger.update("T1", json!({}), at(3)).unwrap_err();
        assert!(matches!(err, CoreError::TransactionNotFound { .. }));
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut ledger = TransactionLedger::new();
        ledger.create("1", "T1", json!({}), at(0)).unwrap();

        let tx = ledger.cancel("T1", at(1)).unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
        assert!(ledger.get("T1").is_none());
    }

    #[test]
    fn test_terminal_id_may_be_reused() {
        let mut ledger = TransactionLedger::new();
        ledger.create("1", "T1", json!({"v": 1}), at(0)).unwrap();
        ledger.complete("T1", at(1)).unwrap();

        let tx = ledger.create("1", "T1", json!({"v": 2}), at(2)).unwrap();
        assert_eq!(tx.payload, json!({"v": 2}));
        assert_eq!(tx.status, TransactionStatus::Active);
    }

    #[test]
    fn test_non_object_payload_replaces() {
        let mut ledger = TransactionLedger::new();
        ledger.create("1", "T1", json!({"a": 1}), at(0)).unwrap();

        let tx = ledger.update("T1", json!("raw"), at(1)).unwrap();
        assert_eq!(tx.payload, json!("raw"));
    }
}
