//! # Warranty Repository
//!
//! Warranty registrations and their append-only event log.
//!
//! ## Data Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Warranty Tables                                   │
//! │                                                                         │
//! │  warranty_registrations        warranty_events                         │
//! │  ┌──────────────────────┐      ┌──────────────────────────┐            │
//! │  │ id (client-assigned) │◄─────│ registration_id (FK)     │            │
//! │  │ customer_email       │      │ event_type               │            │
//! │  │ expiry_date          │      │ payload (JSON)           │            │
//! │  │ ...                  │      │ created_at               │            │
//! │  └──────────────────────┘      └──────────────────────────┘            │
//! │         │                                                              │
//! │         │  registrations are UPSERTed (latest wins)                    │
//! │         │  events are append-only (an audit trail)                     │
//! │         ▼                                                              │
//! │  expiring_before(cutoff) feeds the expiry scan                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use atlas_core::WarrantyRegistration;

/// Repository for warranty registrations and events.
#[derive(Debug, Clone)]
pub struct WarrantyRepository {
    pool: SqlitePool,
}

impl WarrantyRepository {
    /// Creates a new WarrantyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarrantyRepository { pool }
    }

    /// Inserts or updates a warranty registration.
    ///
    /// Registrations are keyed by a client-assigned ID. A repeated
    /// registration with the same ID overwrites the customer and
    /// expiry fields; `created_at` is preserved from the first insert.
    pub async fn upsert_registration(&self, reg: &WarrantyRegistration) -> DbResult<()> {
        debug!(registration_id = %reg.id, "Upserting warranty registration");

        sqlx::query(
            r#"
            INSERT INTO warranty_registrations (
                id, customer_name, customer_email, product_name,
                expiry_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                customer_name = excluded.customer_name,
                customer_email = excluded.customer_email,
                product_name = excluded.product_name,
                expiry_date = excluded.expiry_date,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&reg.id)
        .bind(&reg.customer_name)
        .bind(&reg.customer_email)
        .bind(&reg.product_name)
        .bind(reg.expiry_date.to_rfc3339())
        .bind(reg.created_at.to_rfc3339())
        .bind(reg.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a registration by ID.
    pub async fn get_registration(&self, id: &str) -> DbResult<Option<WarrantyRegistration>> {
        let reg = sqlx::query_as::<_, WarrantyRegistration>(
            r#"
            SELECT id, customer_name, customer_email, product_name,
                   expiry_date, created_at, updated_at
            FROM warranty_registrations
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reg)
    }

    /// Lists registrations whose warranty expires before the cutoff.
    ///
    /// Used by the expiry scan: the cutoff is `now + expiry_window`,
    /// so the result covers both already-expired and soon-to-expire
    /// registrations. Ordered by expiry date (soonest first).
    pub async fn expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<WarrantyRegistration>> {
        let regs = sqlx::query_as::<_, WarrantyRegistration>(
            r#"
            SELECT id, customer_name, customer_email, product_name,
                   expiry_date, created_at, updated_at
            FROM warranty_registrations
            WHERE expiry_date < ?1
            ORDER BY expiry_date ASC
            "#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(regs)
    }

    /// Appends an event to a registration's audit trail.
    ///
    /// ## Arguments
    /// * `registration_id` - The registration the event belongs to
    /// * `event_type` - Event kind string (e.g., "registered", "claim_created")
    /// * `payload` - JSON payload with the event's details
    ///
    /// ## Returns
    /// The generated event ID.
    pub async fn record_event(
        &self,
        registration_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO warranty_events (id, registration_id, event_type, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(registration_id)
        .bind(event_type)
        .bind(payload.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(
            registration_id = %registration_id,
            event_type = %event_type,
            "Recorded warranty event"
        );

        Ok(id)
    }

    /// Counts the events recorded for a registration.
    pub async fn count_events(&self, registration_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM warranty_events WHERE registration_id = ?1",
        )
        .bind(registration_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    fn registration(id: &str, expiry: DateTime<Utc>) -> WarrantyRegistration {
        let now = Utc::now();
        WarrantyRegistration {
            id: id.to_string(),
            customer_name: Some("Ada".to_string()),
            customer_email: "ada@example.com".to_string(),
            product_name: Some("Receipt Printer".to_string()),
            expiry_date: expiry,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = setup().await;
        let repo = db.warranty();

        let reg = registration("w-1", Utc::now() + Duration::days(90));
        repo.upsert_registration(&reg).await.unwrap();

        let found = repo.get_registration("w-1").await.unwrap().unwrap();
        assert_eq!(found.customer_email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let db = setup().await;
        let repo = db.warranty();

        let mut reg = registration("w-1", Utc::now() + Duration::days(90));
        repo.upsert_registration(&reg).await.unwrap();

        reg.customer_email = "new@example.com".to_string();
        repo.upsert_registration(&reg).await.unwrap();

        let found = repo.get_registration("w-1").await.unwrap().unwrap();
        assert_eq!(found.customer_email, "new@example.com");
    }

    #[tokio::test]
    async fn test_expiring_before_filters_and_orders() {
        let db = setup().await;
        let repo = db.warranty();
        let now = Utc::now();

        repo.upsert_registration(&registration("soon", now + Duration::days(5)))
            .await
            .unwrap();
        repo.upsert_registration(&registration("later", now + Duration::days(20)))
            .await
            .unwrap();
        repo.upsert_registration(&registration("far", now + Duration::days(365)))
            .await
            .unwrap();

        let regs = repo.expiring_before(now + Duration::days(30)).await.unwrap();
        let ids: Vec<&str> = regs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "later"]);
    }

    #[tokio::test]
    async fn test_record_and_count_events() {
        let db = setup().await;
        let repo = db.warranty();

        let reg = registration("w-9", Utc::now() + Duration::days(30));
        repo.upsert_registration(&reg).await.unwrap();

        repo.record_event("w-9", "registered", &serde_json::json!({"source": "pos"}))
            .await
            .unwrap();
        repo.record_event("w-9", "claim_created", &serde_json::json!({"claimId": "c-1"}))
            .await
            .unwrap();

        assert_eq!(repo.count_events("w-9").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_event_requires_registration() {
        let db = setup().await;
        let repo = db.warranty();

        let err = repo
            .record_event("missing", "registered", &serde_json::json!({}))
            .await;
        assert!(err.is_err());
    }
}
