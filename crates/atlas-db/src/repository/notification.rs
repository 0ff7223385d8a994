//! # Notification Repository
//!
//! Outbound notification records: pending, sent, failed.
//!
//! ## Delivery Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Notification Lifecycle                              │
//! │                                                                         │
//! │  Dispatcher picks a due schedule entry                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_pending() ← row exists BEFORE delivery is attempted            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  delivery attempt                                                      │
//! │       │                                                                 │
//! │       ├── ok ──► mark_sent()    (status = 'sent', sent_at set)         │
//! │       │                                                                 │
//! │       └── err ─► mark_failed()  (status = 'failed', last_error set)    │
//! │                                                                         │
//! │  A crash between insert and mark leaves a 'pending' row - visible      │
//! │  in diagnostics, never silently lost.                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Repository for notification records.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Inserts a pending notification record.
    ///
    /// Called before the delivery attempt so a crash mid-dispatch
    /// leaves an auditable pending row.
    ///
    /// ## Returns
    /// The generated notification ID.
    pub async fn insert_pending(
        &self,
        registration_id: &str,
        notification_type: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, registration_id, notification_type, recipient,
                subject, body, status, last_error, created_at, sent_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', NULL, ?7, NULL)
            "#,
        )
        .bind(&id)
        .bind(registration_id)
        .bind(notification_type)
        .bind(recipient)
        .bind(subject)
        .bind(body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(
            notification_id = %id,
            registration_id = %registration_id,
            notification_type = %notification_type,
            "Inserted pending notification"
        );

        Ok(id)
    }

    /// Marks a notification as sent.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE notifications SET
                status = 'sent',
                sent_at = ?2,
                last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a notification as failed with the delivery error.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE notifications SET
                status = 'failed',
                last_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Checks whether a notification of this type was already sent
    /// for a registration.
    ///
    /// The expiry scan uses this to avoid re-queueing a reminder that
    /// was dispatched on an earlier pass.
    pub async fn has_sent(&self, registration_id: &str, notification_type: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE registration_id = ?1
              AND notification_type = ?2
              AND status = 'sent'
            "#,
        )
        .bind(registration_id)
        .bind(notification_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Counts notifications by status ("pending", "sent", "failed").
    pub async fn count_by_status(&self, status: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE status = ?1")
                .bind(status)
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

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_pending_then_mark_sent() {
        let db = setup().await;
        let repo = db.notifications();

        let id = repo
            .insert_pending("w-1", "warranty_expiring", "ada@example.com", "s", "b")
            .await
            .unwrap();

        assert_eq!(repo.count_by_status("pending").await.unwrap(), 1);

        repo.mark_sent(&id).await.unwrap();

        assert_eq!(repo.count_by_status("pending").await.unwrap(), 0);
        assert_eq!(repo.count_by_status("sent").await.unwrap(), 1);
        assert!(repo.has_sent("w-1", "warranty_expiring").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_failed_records_error() {
        let db = setup().await;
        let repo = db.notifications();

        let id = repo
            .insert_pending("w-2", "warranty_expired", "bob@example.com", "s", "b")
            .await
            .unwrap();
        repo.mark_failed(&id, "smtp timeout").await.unwrap();

        assert_eq!(repo.count_by_status("failed").await.unwrap(), 1);
        // A failed notification does not count as sent
        assert!(!repo.has_sent("w-2", "warranty_expired").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_sent_is_type_specific() {
        let db = setup().await;
        let repo = db.notifications();

        let id = repo
            .insert_pending("w-3", "warranty_expiring", "c@example.com", "s", "b")
            .await
            .unwrap();
        repo.mark_sent(&id).await.unwrap();

        assert!(repo.has_sent("w-3", "warranty_expiring").await.unwrap());
        assert!(!repo.has_sent("w-3", "warranty_expired").await.unwrap());
    }
}
