//! # Inventory Ledger
//!
//! The per-store product-quantity ledger behind the inventory-sync actor.
//!
//! ## Fold Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Inventory Mutation Semantics                         │
//! │                                                                         │
//! │  absent ──first write──► quantity = result of the adjustment           │
//! │                                                                         │
//! │  add N       quantity' = quantity + N        (saturating)              │
//! │  subtract N  quantity' = max(0, quantity-N)  (floors at zero)          │
//! │  set N       quantity' = max(0, N)           (clamps to zero)          │
//! │                                                                         │
//! │  N < 0 ──► CoreError::InvalidQuantity, NO state change                 │
//! │                                                                         │
//! │  Example (the canonical fold):                                         │
//! │    absent → add 10 → 10 → subtract 15 → 0 → set 7 → 7                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger is pure: the caller supplies `now`, so the same mutation
//! sequence always folds to the same final state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{InventoryAdjustment, InventoryRecord};

/// Product-quantity ledger for one store.
///
/// Keyed by product ID; the store ID is carried on each record because
/// broadcasts and composite keys need it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryLedger {
    records: BTreeMap<String, InventoryRecord>,
}

impl InventoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one adjustment and returns the resulting record.
    ///
    /// The record is created on first write. Negative request quantities
    /// are rejected before any state change; results are clamped so the
    /// stored quantity is never negative.
    pub fn apply(
        &mut self,
        store_id: &str,
        product_id: &str,
        adjustment: InventoryAdjustment,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<InventoryRecord> {
        if quantity < 0 {
            return Err(CoreError::InvalidQuantity { value: quantity });
        }

        let record = self
            .records
            .entry(product_id.to_string())
            .or_insert_with(|| InventoryRecord {
                store_id: store_id.to_string(),
                product_id: product_id.to_string(),
                quantity: 0,
                updated_at: now,
            });

        record.quantity = match adjustment {
            InventoryAdjustment::Add => record.quantity.saturating_add(quantity),
            InventoryAdjustment::Subtract => record.quantity.saturating_sub(quantity).max(0),
            InventoryAdjustment::Set => quantity.max(0),
        };
        record.updated_at = now;

        Ok(record.clone())
    }

    /// Looks up one product's record.
    pub fn get(&self, product_id: &str) -> Option<&InventoryRecord> {
        self.records.get(product_id)
    }

    /// All records, in product-ID order.
    pub fn records(&self) -> Vec<InventoryRecord> {
        self.records.values().cloned().collect()
    }

    /// Number of tracked products.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no products are tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
