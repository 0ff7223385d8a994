//! # Actor Runtime
//!
//! One in-memory instance per actor key, created lazily and never
//! evicted for the life of the process.
//!
//! ## Instance Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Actor Runtime                                   │
//! │                                                                         │
//! │  request for key "store-1"                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ActorHost.instance("store-1")   ← global map lock (creation only)     │
//! │       │                                                                 │
//! │       ├── hit  ──► existing Arc<ActorCell>                             │
//! │       └── miss ──► new cell: Gate + SessionRegistry + Broadcaster      │
//! │                    (state = initial, loaded = false)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cell.state()                    ← the cell's OWN gate                 │
//! │       │                                                                 │
//! │       ├── first access: load persisted snapshot INSIDE the gate        │
//! │       │   (two concurrent first requests cannot both load and          │
//! │       │    clobber each other - the second finds loaded = true)        │
//! │       │                                                                 │
//! │       └── afterwards: the in-memory state IS the truth; the store      │
//! │           is written after each mutation, never re-read                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::broadcast::Broadcaster;
use crate::error::RealtimeResult;
use crate::gate::Gate;
use crate::session::SessionRegistry;
use crate::store::StateStore;
use atlas_db::ActorStateRepository;

// =============================================================================
// Actor Cell
// =============================================================================

/// Gate-protected payload: the state plus its load flag.
#[derive(Debug)]
struct CellState<S> {
    loaded: bool,
    state: S,
}

/// One actor instance: state behind its gate, plus the sessions
/// attached to it.
#[derive(Debug)]
pub struct ActorCell<S> {
    key: String,
    gate: Gate<CellState<S>>,
    sessions: SessionRegistry,
    broadcaster: Broadcaster,
    store: StateStore<S>,
}

impl<S> ActorCell<S>
where
    S: Serialize + DeserializeOwned + Send,
{
    /// The actor key this cell serves.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cell's session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The cell's broadcaster.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Acquires the gate and returns the state, loading the persisted
    /// snapshot on first access.
    ///
    /// The guard holds the gate until dropped; the whole
    /// transform→persist→broadcast sequence runs under it.
    ///
    /// A load failure leaves `loaded` unset so the next access retries
    /// rather than silently starting from the initial state.
    pub async fn state(&self) -> RealtimeResult<StateGuard<'_, S>> {
        let mut guard = self.gate.enter().await;

        if !guard.loaded {
            if let Some(persisted) = self.store.load(&self.key).await? {
                guard.state = persisted;
            }
            guard.loaded = true;
            debug!(kind = self.store.kind(), key = %self.key, "Actor state ready");
        }

        Ok(StateGuard { guard })
    }

    /// Persists the state blob. Called while the [`StateGuard`] is
    /// held, after the in-memory mutation has been applied.
    pub async fn persist(&self, state: &S) -> RealtimeResult<()> {
        self.store.save(&self.key, state).await
    }

    /// Runs a read over the state through the gate.
    pub async fn with_state<T>(&self, f: impl FnOnce(&S) -> T) -> RealtimeResult<T> {
        let guard = self.state().await?;
        Ok(f(&guard))
    }
}

/// Gate guard dereferencing to the actor state.
pub struct StateGuard<'a, S> {
    guard: MutexGuard<'a, CellState<S>>,
}

impl<S> Deref for StateGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard.state
    }
}

impl<S> DerefMut for StateGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard.state
    }
}

// =============================================================================
// Actor Host
// =============================================================================

/// Process-wide registry of one actor kind's instances.
///
/// Keys map to cells; cells are created on first access and kept for
/// the life of the process (the active-key set is small and bounded
/// by the store fleet).
pub struct ActorHost<S> {
    kind: &'static str,
    repo: ActorStateRepository,
    init: Arc<dyn Fn() -> S + Send + Sync>,
    cells: Mutex<HashMap<String, Arc<ActorCell<S>>>>,
}

impl<S> ActorHost<S>
where
    S: Serialize + DeserializeOwned + Send,
{
    /// Creates a host for the given actor kind.
    ///
    /// `init` produces the initial state for a key with no persisted
    /// snapshot (capacity and similar knobs are baked in here).
    pub fn new(
        kind: &'static str,
        repo: ActorStateRepository,
        init: impl Fn() -> S + Send + Sync + 'static,
    ) -> Self {
        ActorHost {
            kind,
            repo,
            init: Arc::new(init),
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the instance for a key, creating it on first access.
    pub async fn instance(&self, key: &str) -> Arc<ActorCell<S>> {
        let mut cells = self.cells.lock().await;

        if let Some(cell) = cells.get(key) {
            return Arc::clone(cell);
        }

        debug!(kind = self.kind, key = %key, "Creating actor instance");

        let sessions = SessionRegistry::new();
        let cell = Arc::new(ActorCell {
            key: key.to_string(),
            gate: Gate::new(CellState {
                loaded: false,
                state: (self.init)(),
            }),
            broadcaster: Broadcaster::new(sessions.clone()),
            sessions,
            store: StateStore::new(self.kind, self.repo.clone()),
        });

        cells.insert(key.to_string(), Arc::clone(&cell));
        cell
    }

    /// Returns the instance for a key without creating it.
    pub async fn get(&self, key: &str) -> Option<Arc<ActorCell<S>>> {
        self.cells.lock().await.get(key).map(Arc::clone)
    }

    /// Live instance keys.
    pub async fn keys(&self) -> Vec<String> {
        self.cells.lock().await.keys().cloned().collect()
    }

    /// Number of live instances.
    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    /// Total sessions across all instances.
    pub async fn session_count(&self) -> usize {
        let cells: Vec<Arc<ActorCell<S>>> =
            self.cells.lock().await.values().map(Arc::clone).collect();

        let mut total = 0;
        for cell in cells {
            total += cell.sessions.len().await;
        }
        total
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

    async fn host() -> (Database, ActorHost<Counter>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let host = ActorHost::new("counter", db.actor_state(), Counter::default);
        (db, host)
    }

    #[tokio::test]
    async fn test_same_key_resolves_same_instance() {
        let (_db, host) = host().await;

        let a = host.instance("k1").await;
        let b = host.instance("k1").await;
        let c = host.instance("k2").await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(host.len().await, 2);
    }

    #[tokio::test]
    async fn test_first_access_loads_persisted_snapshot() {
        let (db, host) = host().await;

        // A snapshot from a "previous run"
        db.actor_state()
            .save("counter", "k1", r#"{"value":7}"#)
            .await
            .unwrap();

        let cell = host.instance("k1").await;
        let value = cell.with_state(|s| s.value).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_mutation_persists_and_survives_restart() {
        let (db, host) = host().await;

        let cell = host.instance("k1").await;
        {
            let mut state = cell.state().await.unwrap();
            state.value = 3;
            cell.persist(&state).await.unwrap();
        }

        // A fresh host over the same database simulates a restart
        let host2 = ActorHost::new("counter", db.actor_state(), Counter::default);
        let cell2 = host2.instance("k1").await;
        assert_eq!(cell2.with_state(|s| s.value).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_loads_once() {
        let (db, host) = host().await;
        let host = Arc::new(host);

        db.actor_state()
            .save("counter", "k1", r#"{"value":10}"#)
            .await
            .unwrap();

        // Both tasks race the cold start; the gate makes the second
        // one find loaded=true instead of clobbering the first
        let mut handles = Vec::new();
        for _ in 0..2 {
            let host = Arc::clone(&host);
            handles.push(tokio::spawn(async move {
                let cell = host.instance("k1").await;
                let mut state = cell.state().await.unwrap();
                state.value += 1;
                cell.persist(&state).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let cell = host.instance("k1").await;
        assert_eq!(cell.with_state(|s| s.value).await.unwrap(), 12);
    }
}
