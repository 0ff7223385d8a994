//! # Notification Dispatcher
//!
//! Turns due schedule entries into durable notification records and
//! hands them to the delivery channel.
//!
//! ## Dispatch Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Notification Dispatch                               │
//! │                                                                         │
//! │  due ScheduleEntry (from the warranty scan)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  render subject + body from the entry's fields                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert 'pending' row       ← durable BEFORE the attempt               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  delivery.deliver(record)   ← trait boundary; LogDelivery by default   │
//! │       │                                                                 │
//! │       ├── ok  ──► mark 'sent'   ──► Outcome::Sent                      │
//! │       │           (caller removes the schedule entry)                  │
//! │       │                                                                 │
//! │       └── err ──► mark 'failed' ──► Outcome::Failed                    │
//! │                   (entry stays; retried next scan tick)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::RealtimeResult;
use atlas_core::{NotificationKind, NotificationRecord, NotificationStatus, ScheduleEntry};
use atlas_db::NotificationRepository;

// =============================================================================
// Delivery Boundary
// =============================================================================

/// The outbound delivery channel (email gateway, push service, ...).
///
/// The error is a plain string: the dispatcher only records it, it
/// never inspects it.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, record: &NotificationRecord) -> Result<(), String>;
}

/// Default delivery: a structured log line.
///
/// Stands in for the real channel in development and tests; the
/// record is still durably tracked either way.
#[derive(Debug, Default, Clone)]
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, record: &NotificationRecord) -> Result<(), String> {
        info!(
            notification_id = %record.id,
            recipient = %record.recipient,
            subject = %record.subject,
            "Delivering notification"
        );
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Delivered; the caller removes the schedule entry.
    Sent { notification_id: String },

    /// Delivery failed; the entry stays for the next scan tick.
    Failed {
        notification_id: String,
        error: String,
    },
}

/// Dispatches due schedule entries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifications: NotificationRepository,
    delivery: Arc<dyn NotificationDelivery>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given delivery channel.
    pub fn new(
        notifications: NotificationRepository,
        delivery: Arc<dyn NotificationDelivery>,
    ) -> Self {
        NotificationDispatcher {
            notifications,
            delivery,
        }
    }

    /// Dispatches one due entry: pending row, delivery attempt, final
    /// status.
    pub async fn dispatch(&self, entry: &ScheduleEntry) -> RealtimeResult<DispatchOutcome> {
        let (subject, body) = render(entry);

        let notification_id = self
            .notifications
            .insert_pending(
                &entry.registration_id,
                entry.kind.as_str(),
                &entry.recipient,
                &subject,
                &body,
            )
            .await?;

        let record = NotificationRecord {
            id: notification_id.clone(),
            registration_id: entry.registration_id.clone(),
            notification_type: entry.kind,
            recipient: entry.recipient.clone(),
            subject,
            body,
            status: NotificationStatus::Pending,
            last_error: None,
            created_at: Utc::now(),
            sent_at: None,
        };

        match self.delivery.deliver(&record).await {
            Ok(()) => {
                self.notifications.mark_sent(&notification_id).await?;
                info!(
                    notification_id = %notification_id,
                    registration_id = %entry.registration_id,
                    "Notification sent"
                );
                Ok(DispatchOutcome::Sent { notification_id })
            }
            Err(error) => {
                self.notifications
                    .mark_failed(&notification_id, &error)
                    .await?;
                warn!(
                    notification_id = %notification_id,
                    registration_id = %entry.registration_id,
                    error = %error,
                    "Notification delivery failed"
                );
                Ok(DispatchOutcome::Failed {
                    notification_id,
                    error,
                })
            }
        }
    }
}

/// Renders subject and body from the entry's fields.
fn render(entry: &ScheduleEntry) -> (String, String) {
    let customer = entry.customer_name.as_deref().unwrap_or("customer");
    let product = entry.product_name.as_deref().unwrap_or("your product");
    let expiry = entry.expiry_date.format("%Y-%m-%d");

    match entry.kind {
        NotificationKind::WarrantyExpiring => (
            format!("Warranty expiring soon: {product}"),
            format!(
                "Hello {customer}, the warranty for {product} expires on {expiry}. \
                 Contact your store to review coverage options."
            ),
        ),
        NotificationKind::WarrantyExpired => (
            format!("Warranty expired: {product}"),
            format!(
                "Hello {customer}, the warranty for {product} expired on {expiry}."
            ),
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_db::{Database, DbConfig};
    use chrono::Duration;

    struct RejectingDelivery;

    #[async_trait]
    impl NotificationDelivery for RejectingDelivery {
        async fn deliver(&self, _record: &NotificationRecord) -> Result<(), String> {
            Err("gateway unreachable".to_string())
        }
    }

    fn entry(kind: NotificationKind) -> ScheduleEntry {
        let now = Utc::now();
        ScheduleEntry {
            registration_id: "w-1".to_string(),
            kind,
            scheduled_at: now,
            recipient: "ada@example.com".to_string(),
            customer_name: Some("Ada".to_string()),
            product_name: Some("Receipt Printer".to_string()),
            expiry_date: now + Duration::days(30),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_successful_dispatch_marks_sent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dispatcher =
            NotificationDispatcher::new(db.notifications(), Arc::new(LogDelivery));

        let outcome = dispatcher
            .dispatch(&entry(NotificationKind::WarrantyExpiring))
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Sent { .. }));
        assert_eq!(db.notifications().count_by_status("sent").await.unwrap(), 1);
        assert!(db
            .notifications()
            .has_sent("w-1", "warranty_expiring")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_failed_dispatch_marks_failed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dispatcher =
            NotificationDispatcher::new(db.notifications(), Arc::new(RejectingDelivery));

        let outcome = dispatcher
            .dispatch(&entry(NotificationKind::WarrantyExpired))
            .await
            .unwrap();

        match outcome {
            DispatchOutcome::Failed { error, .. } => {
                assert_eq!(error, "gateway unreachable");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            db.notifications().count_by_status("failed").await.unwrap(),
            1
        );
        assert_eq!(db.notifications().count_by_status("sent").await.unwrap(), 0);
    }

    #[test]
    fn test_render_mentions_product_and_expiry() {
        let e = entry(NotificationKind::WarrantyExpiring);
        let (subject, body) = render(&e);
        assert!(subject.contains("Receipt Printer"));
        assert!(body.contains("Ada"));
        assert!(body.contains(&e.expiry_date.format("%Y-%m-%d").to_string()));
    }
}
