//! Concurrency-safe, identity-assigning registry.
//!
//! A generic building block: it maps `u64` identities to values, hands out
//! auto-incrementing identities, and can be shared between tasks behind an
//! `Arc`. It knows nothing about clients or messages.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

/// First identity handed out by [`Registry::new`].
pub const DEFAULT_START_ID: u64 = 1;

struct Inner<T> {
    entries: HashMap<u64, T>,
    next_id: u64,
}

/// Thread-safe map of values with auto-incrementing identities.
///
/// Every operation takes one short critical section; the lock is never held
/// while user code runs (see [`Registry::for_each`]).
pub struct Registry<T> {
    inner: Mutex<Inner<T>>,
    // Mirror of `entries.len()`, written inside the critical section.
    len: AtomicUsize,
}

impl<T: Clone> Registry<T> {
    /// Create an empty registry whose first identity is 1
    pub fn new() -> Self {
        Self::build(HashMap::new(), DEFAULT_START_ID)
    }

    /// Create an empty registry with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(HashMap::with_capacity(capacity), DEFAULT_START_ID)
    }

    /// Create an empty registry whose first identity is `start`
    pub fn starting_at(start: u64) -> Self {
        Self::build(HashMap::new(), start)
    }

    fn build(entries: HashMap<u64, T>, next_id: u64) -> Self {
        Self {
            inner: Mutex::new(Inner { entries, next_id }),
            len: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // Every critical section leaves the map consistent, so a panic
        // elsewhere while holding the lock does not invalidate it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `value` under the next free identity and return that identity.
    ///
    /// Concurrent callers never receive the same identity.
    ///
    /// # Panics
    ///
    /// Panics once the identity space is exhausted, i.e. when the identity
    /// handed out would be `u64::MAX`.
    pub fn add(&self, value: T) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id = successor(id);
        inner.entries.insert(id, value);
        self.len.store(inner.entries.len(), Ordering::Relaxed);
        id
    }

    /// Insert `value` under an explicit identity, replacing any entry there.
    ///
    /// The auto-increment counter advances by one, and past `id` if `id` is
    /// ahead of it, so a later [`Registry::add`] never lands on `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is `u64::MAX`.
    pub fn add_with_id(&self, value: T, id: u64) -> u64 {
        let mut inner = self.lock();
        inner.next_id = successor(inner.next_id).max(successor(id));
        inner.entries.insert(id, value);
        self.len.store(inner.entries.len(), Ordering::Relaxed);
        id
    }

    /// Remove the entry for `id`. Absent identities are a no-op.
    pub fn remove(&self, id: u64) -> Option<T> {
        let mut inner = self.lock();
        let removed = inner.entries.remove(&id);
        self.len.store(inner.entries.len(), Ordering::Relaxed);
        removed
    }

    /// Get a copy of the value stored under `id`
    pub fn get(&self, id: u64) -> Option<T> {
        self.lock().entries.get(&id).cloned()
    }

    /// Call `f` for every entry of a point-in-time snapshot.
    ///
    /// The snapshot is copied under the lock and iterated after releasing it,
    /// so `f` may call back into this registry. Mutations made meanwhile are
    /// not seen by the running pass.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(u64, T),
    {
        let snapshot: Vec<(u64, T)> = {
            let inner = self.lock();
            inner
                .entries
                .iter()
                .map(|(id, value)| (*id, value.clone()))
                .collect()
        };

        for (id, value) in snapshot {
            f(id, value);
        }
    }

    /// Approximate number of entries, read without taking the lock
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn successor(id: u64) -> u64 {
    match id.checked_add(1) {
        Some(next) => next,
        None => panic!("registry identity space exhausted"),
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
