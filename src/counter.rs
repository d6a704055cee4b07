//! Contention-safe keyed counter.
//!
//! One coarse mutex guards the whole map. Contention is not the concern
//! here, correctness under unbounded concurrent callers is: every
//! increment lands, and a snapshot never observes a torn update. The
//! map is reachable only through this API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A keyed counter shared between many concurrent actors.
///
/// Handles are cheap clones of the same underlying map; create one at
/// scope start and pass clones to whoever needs to count.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter {
    counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for `key` by one, creating it at 1 if
    /// absent. Never fails; safe from any number of concurrent callers.
    pub fn increment(&self, key: &str) {
        let mut counts = self.lock();
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }

    /// A consistent point-in-time copy of every count.
    ///
    /// Each increment is either fully visible or not yet visible, and
    /// two snapshots with no increments in between are identical.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        // A poisoned lock means another thread panicked mid-update, but
        // the single += under the lock cannot leave the map torn, so
        // the data is still a valid count table.
        match self.counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Atomic fast path for a single unkeyed counter.
///
/// No ordering is promised between adds, only the total: once every
/// `add` has returned, `get` equals their sum.
#[derive(Debug, Default)]
pub struct AtomicTally(AtomicU64);

impl AtomicTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
