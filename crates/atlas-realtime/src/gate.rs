//! # Concurrency Gate
//!
//! The per-instance gate that serializes every state access.
//!
//! ## Single-Writer Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Gate = One Writer Per Key                           │
//! │                                                                         │
//! │  WS handler (store-1) ──┐                                              │
//! │  WS handler (store-1) ──┼──► Gate "store-1" ──► load → transform →     │
//! │  scheduler tick       ──┘        (queue)          persist → broadcast  │
//! │                                                                         │
//! │  WS handler (store-2) ─────► Gate "store-2" ──► ... (in parallel)      │
//! │                                                                         │
//! │  • tokio's async Mutex wakes waiters in FIFO order, so mutations       │
//! │    are applied in submission order                                     │
//! │  • the ENTIRE load→transform→persist→broadcast sequence runs while     │
//! │    the gate is held - two operations on one key never interleave       │
//! │  • reads go through the same gate and always see fully-applied state   │
//! │  • no cross-gate channels: instances share nothing in memory           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::{Mutex, MutexGuard};

/// Fair async mutex guarding one actor instance's state.
///
/// Holding the returned guard across `.await` points is the POINT:
/// persistence and broadcast happen inside the critical section.
#[derive(Debug, Default)]
pub struct Gate<S> {
    inner: Mutex<S>,
}

impl<S> Gate<S> {
    /// Creates a gate around the initial state.
    pub fn new(state: S) -> Self {
        Gate {
            inner: Mutex::new(state),
        }
    }

    /// Acquires the gate. Waiters are queued fairly (FIFO), so
    /// operations complete in the order they arrived.
    pub async fn enter(&self) -> MutexGuard<'_, S> {
        self.inner.lock().await
    }

    /// Runs a closure over the state while holding the gate.
    ///
    /// Convenience for short synchronous sections (reads, pure
    /// transforms); longer sequences hold the guard from [`enter`]
    /// directly.
    ///
    /// [`enter`]: Gate::enter
    pub async fn run<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
