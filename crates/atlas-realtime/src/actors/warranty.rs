//! # Warranty Lifecycle Actor
//!
//! Warranty events, the expiry scan and reminder scheduling.
//!
//! ## Two Entry Points, One Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Warranty Actor                                    │
//! │                                                                         │
//! │  WS / HTTP event                  Scheduler tick                       │
//! │       │                                │                                │
//! │       ▼                                ▼                                │
//! │  ┌──────────────────────── gate "global" ────────────────────────┐     │
//! │  │                                                               │     │
//! │  │  handle_event:                 on_tick:                       │     │
//! │  │  1. audit row                  1. scan registrations with     │     │
//! │  │     (registered also             expiry < now + window:       │     │
//! │  │      upserts the                 expired → entry due at       │     │
//! │  │      registration)               expiry, expiring → entry     │     │
//! │  │  2. broadcast                    due at expiry − window       │     │
//! │  │  3. registered with a            (skip already-scheduled      │     │
//! │  │     future reminder:             and already-sent)            │     │
//! │  │     insert_if_absent +         2. dispatch due entries;       │     │
//! │  │     persist                      Sent → removed,              │     │
//! │  │                                  Failed → retried next tick   │     │
//! │  │                                                               │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Scan failures are logged and re-armed, never fatal.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes};
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::actors::WsActor;
use crate::dispatch::{DispatchOutcome, NotificationDelivery, NotificationDispatcher};
use crate::error::{RealtimeError, RealtimeResult};
use crate::message::{error_frame, to_frame, WarrantyEventData, WarrantyInbound, WarrantyOutbound};
use crate::runtime::{ActorCell, ActorHost};
use crate::scheduler::TickHandler;
use crate::session::{SessionId, SessionScope};
use atlas_core::{
    NotificationKind, NotificationSchedule, ScheduleEntry, WarrantyEventKind, WarrantyRegistration,
};
use atlas_db::{Database, NotificationRepository, WarrantyRepository};

/// The single instance key: the warranty schedule is store-agnostic.
const GLOBAL_KEY: &str = "global";

/// Warranty lifecycle actor.
pub struct WarrantyActor {
    host: ActorHost<NotificationSchedule>,
    warranty: WarrantyRepository,
    notifications: NotificationRepository,
    dispatcher: NotificationDispatcher,
    expiry_window_days: i64,
}

impl WarrantyActor {
    /// Creates the actor with the configured reminder window.
    pub fn new(
        db: &Database,
        delivery: Arc<dyn NotificationDelivery>,
        expiry_window_days: i64,
    ) -> Self {
        WarrantyActor {
            host: ActorHost::new("warranty", db.actor_state(), NotificationSchedule::default),
            warranty: db.warranty(),
            notifications: db.notifications(),
            dispatcher: NotificationDispatcher::new(db.notifications(), delivery),
            expiry_window_days,
        }
    }

    async fn cell(&self) -> Arc<ActorCell<NotificationSchedule>> {
        self.host.instance(GLOBAL_KEY).await
    }

    /// Handles one warranty event: audit row, broadcast, reminder.
    ///
    /// Shared by the WS path and `POST /warranty/event`.
    pub async fn handle_event(
        &self,
        event: WarrantyEventKind,
        registration_id: &str,
        data: WarrantyEventData,
    ) -> RealtimeResult<()> {
        let cell = self.cell().await;
        let mut state = cell.state().await?;
        let now = Utc::now();

        let registration = match event {
            WarrantyEventKind::Registered => {
                let customer_email = data.customer_email.clone().ok_or_else(|| {
                    RealtimeError::Protocol("registered event requires customerEmail".into())
                })?;
                let expiry_date = data.expiry_date.ok_or_else(|| {
                    RealtimeError::Protocol("registered event requires expiryDate".into())
                })?;

                let created_at = self
                    .warranty
                    .get_registration(registration_id)
                    .await?
                    .map(|existing| existing.created_at)
                    .unwrap_or(now);

                let registration = WarrantyRegistration {
                    id: registration_id.to_string(),
                    customer_name: data.customer_name.clone(),
                    customer_email,
                    product_name: data.product_name.clone(),
                    expiry_date,
                    created_at,
                    updated_at: now,
                };
                self.warranty.upsert_registration(&registration).await?;
                registration
            }
            _ => self
                .warranty
                .get_registration(registration_id)
                .await?
                .ok_or_else(|| {
                    RealtimeError::Protocol(format!("unknown registration: {registration_id}"))
                })?,
        };

        self.warranty
            .record_event(registration_id, event.as_str(), &serde_json::to_value(&data)?)
            .await?;

        cell.broadcaster()
            .broadcast(to_frame(&WarrantyOutbound::WarrantyEvent {
                event,
                registration_id: registration_id.to_string(),
                data,
                timestamp: now,
            }))
            .await;

        // A fresh registration schedules its reminder immediately; the
        // scan would pick it up anyway, but only window-days out.
        if event == WarrantyEventKind::Registered {
            let reminder = registration.expiry_date - Duration::days(self.expiry_window_days);
            if reminder > now {
                let inserted = state.insert_if_absent(ScheduleEntry {
                    registration_id: registration.id.clone(),
                    kind: NotificationKind::WarrantyExpiring,
                    scheduled_at: reminder,
                    recipient: registration.customer_email.clone(),
                    customer_name: registration.customer_name.clone(),
                    product_name: registration.product_name.clone(),
                    expiry_date: registration.expiry_date,
                    created_at: now,
                });
                if inserted {
                    cell.persist(&state).await?;
                    debug!(
                        registration_id = %registration.id,
                        scheduled_at = %reminder,
                        "Reminder scheduled"
                    );
                }
            }
        }

        Ok(())
    }

    /// Pending schedule entries (read endpoint).
    pub async fn schedule(&self) -> RealtimeResult<Vec<ScheduleEntry>> {
        let cell = self.cell().await;
        cell.with_state(|schedule| schedule.entries()).await
    }

    /// Connected session count (health endpoint).
    pub async fn session_count(&self) -> usize {
        self.host.session_count().await
    }

    /// One expiry scan pass: refresh the schedule, dispatch due entries.
    async fn scan(&self) -> RealtimeResult<()> {
        let cell = self.cell().await;
        let mut state = cell.state().await?;
        let now = Utc::now();
        let window = Duration::days(self.expiry_window_days);
        let mut changed = false;

        // Step 1: pull registrations inside the window into the schedule
        let registrations = self.warranty.expiring_before(now + window).await?;
        for reg in registrations {
            let (kind, due) = if reg.expiry_date <= now {
                (NotificationKind::WarrantyExpired, reg.expiry_date)
            } else {
                (
                    NotificationKind::WarrantyExpiring,
                    (reg.expiry_date - window).max(now),
                )
            };

            let key = ScheduleEntry::key_for(&reg.id, kind);
            if state.contains(&key) {
                continue;
            }
            // Dispatched on an earlier pass: don't re-create the entry
            if self.notifications.has_sent(&reg.id, kind.as_str()).await? {
                continue;
            }

            changed |= state.insert_if_absent(ScheduleEntry {
                registration_id: reg.id.clone(),
                kind,
                scheduled_at: due,
                recipient: reg.customer_email.clone(),
                customer_name: reg.customer_name.clone(),
                product_name: reg.product_name.clone(),
                expiry_date: reg.expiry_date,
                created_at: now,
            });
        }

        // Step 2: dispatch due entries (oldest first)
        for entry in state.due(now) {
            match self.dispatcher.dispatch(&entry).await {
                Ok(DispatchOutcome::Sent { notification_id }) => {
                    state.remove(&entry.key());
                    changed = true;
                    info!(
                        registration_id = %entry.registration_id,
                        notification_id = %notification_id,
                        kind = %entry.kind.as_str(),
                        "Schedule entry dispatched"
                    );
                }
                Ok(DispatchOutcome::Failed { error, .. }) => {
                    // Entry stays; the next tick retries
                    warn!(
                        registration_id = %entry.registration_id,
                        error = %error,
                        "Dispatch failed, entry retained"
                    );
                }
                Err(err) => {
                    warn!(
                        registration_id = %entry.registration_id,
                        error = %err,
                        "Dispatch errored, entry retained"
                    );
                }
            }
        }

        if changed {
            cell.persist(&state).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TickHandler for WarrantyActor {
    async fn on_tick(&self) -> RealtimeResult<()> {
        self.scan().await
    }
}

#[async_trait]
impl WsActor for WarrantyActor {
    async fn connect(&self, scope: &SessionScope, sender: mpsc::Sender<Message>) -> SessionId {
        let cell = self.cell().await;
        cell.sessions().register(scope.clone(), sender).await
    }

    async fn handle_text(&self, _scope: &SessionScope, text: &str) -> Utf8Bytes {
        let inbound: WarrantyInbound = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(err) => return error_frame(&RealtimeError::Protocol(err.to_string())),
        };

        match inbound {
            WarrantyInbound::Ping => to_frame(&WarrantyOutbound::Pong {
                timestamp: Utc::now(),
            }),
            WarrantyInbound::WarrantyEvent {
                event,
                registration_id,
                data,
            } => match self.handle_event(event, &registration_id, data).await {
                Ok(()) => to_frame(&WarrantyOutbound::Ack {
                    registration_id,
                    event,
                }),
                Err(err) => {
                    if !err.is_protocol_error() {
                        warn!(registration_id = %registration_id, error = %err, "Warranty event failed");
                    }
                    error_frame(&err)
                }
            },
        }
    }

    async fn disconnect(&self, _scope: &SessionScope, session_id: SessionId) {
        self.cell().await.sessions().unregister(session_id).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::LogDelivery;
    use atlas_core::NotificationRecord;
    use atlas_db::DbConfig;
    use chrono::DateTime;

    struct RejectingDelivery;

    #[async_trait]
    impl NotificationDelivery for RejectingDelivery {
        async fn deliver(&self, _record: &NotificationRecord) -> Result<(), String> {
            Err("gateway down".to_string())
        }
    }

    fn registered_data(email: &str, expiry: DateTime<Utc>) -> WarrantyEventData {
        WarrantyEventData {
            customer_name: Some("Ada".to_string()),
            customer_email: Some(email.to_string()),
            product_name: Some("Receipt Printer".to_string()),
            expiry_date: Some(expiry),
            ..Default::default()
        }
    }

    async fn actor(delivery: Arc<dyn NotificationDelivery>) -> (Database, WarrantyActor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = WarrantyActor::new(&db, delivery, 30);
        (db, actor)
    }

    #[tokio::test]
    async fn test_registered_requires_email_and_expiry() {
        let (_db, actor) = actor(Arc::new(LogDelivery)).await;

        let err = actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                WarrantyEventData {
                    expiry_date: Some(Utc::now() + Duration::days(90)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_protocol_error());

        let err = actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                WarrantyEventData {
                    customer_email: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[tokio::test]
    async fn test_registered_upserts_and_schedules_once() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;
        let expiry = Utc::now() + Duration::days(90);

        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", expiry),
            )
            .await
            .unwrap();

        // Duplicate registration: idempotent scheduling
        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", expiry),
            )
            .await
            .unwrap();

        let schedule = actor.schedule().await.unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].kind, NotificationKind::WarrantyExpiring);

        let reg = db.warranty().get_registration("w-1").await.unwrap().unwrap();
        assert_eq!(reg.customer_email, "ada@example.com");
        assert_eq!(db.warranty().count_events("w-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_registration_inside_window_defers_to_the_scan() {
        let (_db, actor) = actor(Arc::new(LogDelivery)).await;

        // Expires in 10 days: the 30-day reminder date is already past
        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", Utc::now() + Duration::days(10)),
            )
            .await
            .unwrap();

        assert!(actor.schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_on_unknown_registration_is_rejected() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;

        let err = actor
            .handle_event(
                WarrantyEventKind::ClaimCreated,
                "missing",
                WarrantyEventData::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(db.warranty().count_events("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claim_event_records_audit_row_and_broadcasts() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;
        let expiry = Utc::now() + Duration::days(90);

        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", expiry),
            )
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(crate::session::SESSION_QUEUE_DEPTH);
        actor.connect(&SessionScope::default(), tx).await;

        actor
            .handle_event(
                WarrantyEventKind::ClaimCreated,
                "w-1",
                WarrantyEventData {
                    claim_id: Some("c-1".to_string()),
                    notes: Some("screen cracked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(db.warranty().count_events("w-1").await.unwrap(), 2);

        let Some(Message::Text(frame)) = rx.recv().await else {
            panic!("expected broadcast");
        };
        let json: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(json["type"], "warranty_event");
        assert_eq!(json["event"], "claim_created");
        assert_eq!(json["data"]["claimId"], "c-1");
    }

    #[tokio::test]
    async fn test_scan_dispatches_expiring_registration() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;

        // Expires in 10 days: inside the 30-day window, reminder due now
        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", Utc::now() + Duration::days(10)),
            )
            .await
            .unwrap();

        actor.on_tick().await.unwrap();

        assert_eq!(db.notifications().count_by_status("sent").await.unwrap(), 1);
        assert!(db
            .notifications()
            .has_sent("w-1", "warranty_expiring")
            .await
            .unwrap());
        // Sent entry was removed
        assert!(actor.schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_dispatches_expired_registration() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;

        let expired = Utc::now() - Duration::days(2);
        let now = Utc::now();
        db.warranty()
            .upsert_registration(&WarrantyRegistration {
                id: "w-old".to_string(),
                customer_name: None,
                customer_email: "old@example.com".to_string(),
                product_name: None,
                expiry_date: expired,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        actor.on_tick().await.unwrap();

        assert!(db
            .notifications()
            .has_sent("w-old", "warranty_expired")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_scan_does_not_recreate_sent_entries() {
        let (db, actor) = actor(Arc::new(LogDelivery)).await;

        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", Utc::now() + Duration::days(10)),
            )
            .await
            .unwrap();

        actor.on_tick().await.unwrap();
        actor.on_tick().await.unwrap();

        // Still exactly one sent notification, and no resurrected entry
        assert_eq!(db.notifications().count_by_status("sent").await.unwrap(), 1);
        assert!(actor.schedule().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_dispatch_retains_entry_for_next_tick() {
        let (db, actor) = actor(Arc::new(RejectingDelivery)).await;

        actor
            .handle_event(
                WarrantyEventKind::Registered,
                "w-1",
                registered_data("ada@example.com", Utc::now() + Duration::days(10)),
            )
            .await
            .unwrap();

        actor.on_tick().await.unwrap();

        assert_eq!(
            db.notifications().count_by_status("failed").await.unwrap(),
            1
        );
        // Entry retained for retry
        let schedule = actor.schedule().await.unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].registration_id, "w-1");
    }
}
