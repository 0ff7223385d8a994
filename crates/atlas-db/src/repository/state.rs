//! # Actor State Repository
//!
//! Durable storage for per-actor state snapshots.
//!
//! ## The Snapshot Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Actor State Persistence                              │
//! │                                                                         │
//! │  MUTATION (e.g., inventory update for store-1)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Load state (first touch only - cached in memory afterwards)        │
//! │  2. Apply the mutation to the in-memory state                          │
//! │  3. Serialize the WHOLE state to a JSON blob                           │
//! │  4. UPSERT into actor_state keyed (actor_kind, actor_key)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Restart? The next load for that key returns the last snapshot.        │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • One row per (kind, key) - no history, the row IS the state          │
//! │  • Writes for one key are serialized by the actor's gate               │
//! │  • A missing row means "fresh actor" - callers start from empty       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for actor state snapshots.
#[derive(Debug, Clone)]
pub struct ActorStateRepository {
    pool: SqlitePool,
}

impl ActorStateRepository {
    /// Creates a new ActorStateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActorStateRepository { pool }
    }

    /// Loads the persisted state blob for an actor, if any.
    ///
    /// ## Arguments
    /// * `kind` - Actor kind: "notifications", "inventory", "pos", "warranty"
    /// * `key` - Actor key (e.g., a store ID, or "global")
    ///
    /// ## Returns
    /// The JSON blob as last saved, or `None` for a fresh actor.
    pub async fn load(&self, kind: &str, key: &str) -> DbResult<Option<String>> {
        let blob: Option<String> = sqlx::query_scalar(
            r#"
            SELECT state FROM actor_state
            WHERE actor_kind = ?1 AND actor_key = ?2
            "#,
        )
        .bind(kind)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        debug!(kind = %kind, key = %key, found = blob.is_some(), "Loaded actor state");

        Ok(blob)
    }

    /// Saves an actor's state blob, replacing any previous snapshot.
    ///
    /// Callers serialize the entire state before each save; partial
    /// updates are not supported.
    pub async fn save(&self, kind: &str, key: &str, state: &str) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO actor_state (actor_kind, actor_key, state, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(actor_kind, actor_key) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(state)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(kind = %kind, key = %key, bytes = state.len(), "Saved actor state");

        Ok(())
    }

    /// Deletes an actor's snapshot.
    ///
    /// The next load for this key will see a fresh actor.
    pub async fn delete(&self, kind: &str, key: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            DELETE FROM actor_state
            WHERE actor_kind = ?1 AND actor_key = ?2
            "#,
        )
        .bind(kind)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the keys with a persisted snapshot for a given kind.
    pub async fn keys_for_kind(&self, kind: &str) -> DbResult<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT actor_key FROM actor_state
            WHERE actor_kind = ?1
            ORDER BY actor_key ASC
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
