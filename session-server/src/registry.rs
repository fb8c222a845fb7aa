use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::ServerError;

/// Dense id → owned record table (§4.1). Ids come from a monotonic
/// counter and are never reused, even after [`Self::erase`] — a stale
/// handle always resolves to `UnknownHandle` rather than some other
/// record that happened to reuse its id (Testable Property 1).
///
/// The table itself is guarded by its own reader-writer lock, but that
/// lock is only ever held for the instant it takes to look an id up and
/// clone its `Arc` out (see [`Self::access`]) — never for the duration of
/// a handler body. That keeps independent `emplace`/`erase`/`access`
/// calls on unrelated ids from blocking behind a slow in-flight operation
/// on some other id (§4.1 "concurrent Add*/Remove* on independent ids are
/// safe").
pub struct Registry<T> {
    next_id: AtomicU32,
    records: RwLock<HashMap<u32, Arc<T>>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(0),
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn emplace(&self, record: T) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.write().insert(id, Arc::new(record));
        id
    }

    /// Removes and returns the record, or `None` if the id was unknown.
    /// Recursive removal of a record's own children (Invariant 2) is the
    /// caller's responsibility — it naturally falls out of `T` owning
    /// further `Registry` fields that are dropped along with it.
    pub fn erase(&self, id: u32) -> Option<Arc<T>> {
        self.records.write().remove(&id)
    }

    /// Looks `id` up under a shared lock on the table, clones its `Arc`
    /// out, and drops the table lock *before* calling `f` — so `f` (which
    /// may itself be a long-running handler body, or the next accessor
    /// down a nested `with_*` chain) only ever holds the per-record lock
    /// it takes internally (state_lock/player_lock/gen_lock), never this
    /// table's lock. Any further locking happens inside `f` on the record
    /// itself.
    pub fn access<R>(&self, id: u32, what: &str, f: impl FnOnce(&T) -> Result<R, ServerError>) -> Result<R, ServerError> {
        let record = {
            let guard = self.records.read();
            guard
                .get(&id)
                .cloned()
                .ok_or_else(|| ServerError::UnknownHandle(format!("unknown {what} id {id}")))?
        };
        trace!(what, id, "resolved handle");
        f(&record)
    }

    /// Runs `f` over every record concurrently, one thread per record —
    /// mirroring the original's `ForEachParallel` fan-out used to notify
    /// every dependent player / action generator of a `TakeAction` (§4.2).
    /// The `Arc`s are cloned out and the table lock dropped before `f`
    /// runs, for the same reason as [`Self::access`].
    pub fn for_each_parallel(&self, f: impl Fn(&T) + Sync) {
        let records: Vec<Arc<T>> = self.records.read().values().cloned().collect();
        std::thread::scope(|scope| {
            for record in &records {
                scope.spawn(|| f(record));
            }
        });
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_are_never_reused() {
        let registry: Registry<u32> = Registry::new();
        let a = registry.emplace(10);
        let b = registry.emplace(20);
        registry.erase(a);
        let c = registry.emplace(30);

        assert_ne!(a, c);
        assert_ne!(b, c);
        assert!(registry.access(a, "thing", |_| Ok(())).is_err());
    }

    #[test]
    fn access_reaches_the_record() {
        let registry: Registry<u32> = Registry::new();
        let id = registry.emplace(42);
        let value = registry.access(id, "thing", |v| Ok(*v)).unwrap();
        assert_eq!(value, 42);
    }
}
