//! Typed accessor cache.
//!
//! Each leaf read goes through a [`CachedValue`]: an immutable snapshot of
//! the last decode plus the instant it was computed. Readers load the
//! snapshot without locking; only when it is older than the TTL does a
//! reader take the per-value lock, re-check, and publish a fresh snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::schema::{Leaf, Value};
use crate::store::decode;
use crate::store::parser::RawStore;

/// Default staleness window.
pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

type Supplier<T> = Box<dyn Fn() -> T + Send + Sync>;

struct Snapshot<T> {
    value: T,
    computed_at: Instant,
}

/// A memoized value recomputed lazily once its TTL has elapsed.
pub struct CachedValue<T> {
    supplier: Supplier<T>,
    ttl: Duration,
    snapshot: ArcSwap<Snapshot<T>>,
    recompute: Mutex<()>,
}

impl<T: Clone> CachedValue<T> {
    /// Create the value, computing it once immediately.
    pub fn new<F>(supplier: F, ttl: Duration) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let snapshot = Snapshot {
            value: supplier(),
            computed_at: Instant::now(),
        };
        Self {
            supplier: Box::new(supplier),
            ttl,
            snapshot: ArcSwap::from_pointee(snapshot),
            recompute: Mutex::new(()),
        }
    }

    pub fn get(&self) -> T {
        let current = self.snapshot.load();
        if current.computed_at.elapsed() <= self.ttl {
            return current.value.clone();
        }

        let _guard = self.recompute.lock();
        let current = self.snapshot.load();
        if current.computed_at.elapsed() <= self.ttl {
            return current.value.clone();
        }
        self.publish()
    }

    /// Recompute immediately regardless of age.
    pub fn refresh(&self) -> T {
        let _guard = self.recompute.lock();
        self.publish()
    }

    /// Compute a fresh value without touching the cache.
    pub fn get_raw(&self) -> T {
        (self.supplier)()
    }

    pub fn age(&self) -> Duration {
        self.snapshot.load().computed_at.elapsed()
    }

    fn publish(&self) -> T {
        let value = (self.supplier)();
        self.snapshot.store(Arc::new(Snapshot {
            value: value.clone(),
            computed_at: Instant::now(),
        }));
        value
    }
}

/// Per-leaf cached decodes over a swappable raw store.
pub struct AccessorCache {
    store: Arc<ArcSwap<RawStore>>,
    ttl: Duration,
    entries: DashMap<String, Arc<CachedValue<Value>>>,
}

impl AccessorCache {
    pub fn new(store: Arc<ArcSwap<RawStore>>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Cached decode for `leaf`, creating the entry on first use.
    pub fn get(&self, leaf: &Leaf) -> Value {
        self.entry(leaf).get()
    }

    pub fn refresh(&self, leaf: &Leaf) -> Value {
        self.entry(leaf).refresh()
    }

    /// Decode straight from the current store, bypassing the cache.
    pub fn get_raw(&self, leaf: &Leaf) -> Value {
        let store = self.store.load();
        decode::decode(&leaf.path, &leaf.kind, store.get(&leaf.path), &leaf.default)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Age of the cached decode, if one exists.
    pub fn age(&self, path: &str) -> Option<Duration> {
        self.entries.get(path).map(|e| e.age())
    }

    /// Drop every cached decode.
    pub fn invalidate(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, leaf: &Leaf) -> Arc<CachedValue<Value>> {
        if let Some(entry) = self.entries.get(&leaf.path) {
            return Arc::clone(entry.value());
        }
        let entry = self
            .entries
            .entry(leaf.path.clone())
            .or_insert_with(|| Arc::new(self.supplier_for(leaf)));
        Arc::clone(entry.value())
    }

    fn supplier_for(&self, leaf: &Leaf) -> CachedValue<Value> {
        let store = Arc::clone(&self.store);
        let path = leaf.path.clone();
        let kind = leaf.kind.clone();
        let default = leaf.default.clone();
        CachedValue::new(
            move || {
                let store = store.load();
                decode::decode(&path, &kind, store.get(&path), &default)
            },
            self.ttl,
        )
    }
}
