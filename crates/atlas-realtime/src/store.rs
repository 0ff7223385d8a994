//! # Typed State Store
//!
//! The typed face of the durable state store: binds one actor kind to
//! the `actor_state` table and (de)serializes whole state blobs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Durable State Store                                │
//! │                                                                         │
//! │  StateStore<InventoryState>  kind = "inventory"                        │
//! │       │                                                                 │
//! │       ├── load("store-1")  ──► SELECT state ... ──► serde_json ──► S   │
//! │       │        (None = fresh actor, caller starts from Default)        │
//! │       │                                                                 │
//! │       └── save("store-1")  ──► serde_json ──► UPSERT whole blob        │
//! │                                                                         │
//! │  Called only from inside the owning instance's gate, so saves for      │
//! │  one key never race.                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::RealtimeResult;
use atlas_db::ActorStateRepository;

/// Typed access to one actor kind's persisted snapshots.
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    kind: &'static str,
    repo: ActorStateRepository,
    _marker: PhantomData<fn() -> S>,
}

impl<S> StateStore<S>
where
    S: Serialize + DeserializeOwned,
{
    /// Creates a store for the given actor kind.
    pub fn new(kind: &'static str, repo: ActorStateRepository) -> Self {
        StateStore {
            kind,
            repo,
            _marker: PhantomData,
        }
    }

    /// The actor kind this store is bound to.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Loads the persisted state for a key, or `None` for a fresh actor.
    pub async fn load(&self, key: &str) -> RealtimeResult<Option<S>> {
        let Some(blob) = self.repo.load(self.kind, key).await? else {
            return Ok(None);
        };

        let state = serde_json::from_str(&blob)?;
        debug!(kind = self.kind, key = %key, "Restored actor state");
        Ok(Some(state))
    }

    /// Persists the whole state blob for a key.
    pub async fn save(&self, key: &str, state: &S) -> RealtimeResult<()> {
        let blob = serde_json::to_string(state)?;
        self.repo.save(self.kind, key, &blob).await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_db::{Database, DbConfig};
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u64,
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: StateStore<Counter> = StateStore::new("test", db.actor_state());

        assert!(store.load("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: StateStore<Counter> = StateStore::new("test", db.actor_state());

        store.save("k1", &Counter { value: 42 }).await.unwrap();
        let restored = store.load("k1").await.unwrap().unwrap();
        assert_eq!(restored, Counter { value: 42 });
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store: StateStore<Counter> = StateStore::new("test", db.actor_state());

        store.save("k1", &Counter { value: 1 }).await.unwrap();
        store.save("k2", &Counter { value: 2 }).await.unwrap();

        assert_eq!(store.load("k1").await.unwrap().unwrap().value, 1);
        assert_eq!(store.load("k2").await.unwrap().unwrap().value, 2);
    }
}
