//! Capacity-bounded value cache with FIFO eviction.
//!
//! Caches computed values under keys that are values themselves (typically
//! strings produced by serializing an option set), for collaborators that
//! cannot key by argument identity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    BoundedValueCache<K, V> Layout                       │
//! │                                                                         │
//! │   map: FxHashMap<K, V>            order: VecDeque<K>                    │
//! │        key → value                       insertion order                │
//! │                                                                         │
//! │   ┌──────────┬───────┐            ┌───────────────────────────┐         │
//! │   │   Key    │ Value │            │ front              back   │         │
//! │   ├──────────┼───────┤            ├───────────────────────────┤         │
//! │   │  "k1"    │  v1   │            │ [k1] [k2] [k3] [k4]       │         │
//! │   │  "k2"    │  v2   │            │  ↑                  ↑     │         │
//! │   │  "k3"    │  v3   │            │ oldest            newest  │         │
//! │   │  "k4"    │  v4   │            │ EVICT                     │         │
//! │   └──────────┴───────┘            └───────────────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! get_or_compute(key, f):
//!   1. map hit  → clone value, return (order untouched)
//!   2. map miss → v = f()?        (failure: cache untouched)
//!   3. insert v, push key to back
//!   4. while len > capacity: pop front, remove from map
//! ```
//!
//! ## Eviction order
//!
//! Strictly insertion order. A hit does not refresh an entry, so a hot key
//! inserted early is evicted as readily as a cold one. This matches the
//! string-key caches this crate replaces; switching to recency order would
//! change which creator instances callers observe as shared.
//!
//! ## Operations
//!
//! | Operation            | Time   | Notes                              |
//! |----------------------|--------|------------------------------------|
//! | `get`                | O(1)   | No reordering                      |
//! | `get_or_compute`     | O(1)*  | *Amortized, may evict              |
//! | `insert_if_absent`   | O(1)*  | First writer wins                  |
//! | `pop_oldest`         | O(1)   |                                    |
//! | `clear`              | O(n)   |                                    |
//!
//! ## Example Usage
//!
//! ```
//! use memokit::bounded::BoundedValueCache;
//!
//! let mut cache: BoundedValueCache<String, usize> = BoundedValueCache::new(3).unwrap();
//! for key in ["k1", "k2", "k3", "k4"] {
//!     cache.get_or_compute(key, || key.len());
//! }
//!
//! assert_eq!(cache.len(), 3);
//! assert!(!cache.contains("k1"));
//! assert!(cache.contains("k4"));
//! ```
//!
//! ## Thread Safety
//!
//! Not thread-safe. [`BoundedMemo`](crate::memoize::BoundedMemo) wraps one in
//! a mutex and performs insert-then-evict as a single critical section.

use std::borrow::Borrow;
use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::MemoError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::BoundedMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::BoundedMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    BoundedMetricsRecorder, CoreMetricsRecorder, MetricsReset, MetricsSnapshotProvider,
};
use crate::traits::ReadOnlyCache;

/// Upper bound on slots reserved up front; larger caches grow on demand.
const PREALLOC_LIMIT: usize = 1024;

/// FIFO-bounded mapping from a value key to a computed value.
///
/// # Type Parameters
///
/// - `K`: Key type, must be `Clone + Eq + Hash` (usually `String`)
/// - `V`: Value type, cloned out on every hit (use `Arc<T>` for large values)
pub struct BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    map: FxHashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: BoundedMetrics,
}

impl<K, V> BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// Storage for at most 1024 entries is reserved here. Any positive
    /// capacity is accepted, including `usize::MAX` (effectively unbounded).
    ///
    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if `capacity` is 0.
    ///
    /// ```
    /// use memokit::bounded::BoundedValueCache;
    ///
    /// let cache: BoundedValueCache<String, i32> = BoundedValueCache::new(100).unwrap();
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(BoundedValueCache::<String, i32>::new(0).is_err());
    /// ```
    pub fn new(capacity: usize) -> Result<Self, MemoError> {
        if capacity == 0 {
            return Err(MemoError::InvalidCapacity { capacity });
        }
        Ok(Self {
            map: FxHashMap::with_capacity_and_hasher(
                capacity.min(PREALLOC_LIMIT),
                Default::default(),
            ),
            order: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
            #[cfg(feature = "metrics")]
            metrics: BoundedMetrics::default(),
        })
    }

    /// Looks up `key` without computing or reordering.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Looks up `key`, counting a hit or a miss.
    pub fn lookup<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let found = self.map.get(key).cloned();
        #[cfg(feature = "metrics")]
        match found {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }
        if found.is_none() {
            trace!(len = self.map.len(), "bounded cache miss");
        }
        found
    }

    /// Returns the cached value for `key`, computing and storing it on a
    /// miss.
    ///
    /// ```
    /// use memokit::bounded::BoundedValueCache;
    ///
    /// let mut cache: BoundedValueCache<String, u32> = BoundedValueCache::new(8).unwrap();
    /// let mut calls = 0;
    /// cache.get_or_compute("a", || { calls += 1; 1 });
    /// cache.get_or_compute("a", || { calls += 1; 1 });
    /// assert_eq!(calls, 1);
    /// ```
    pub fn get_or_compute<Q, F>(&mut self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> V,
        V: Clone,
    {
        match self.try_get_or_compute::<Q, _, std::convert::Infallible>(key, || Ok(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    ///
    /// A failing `compute` leaves the cache exactly as it was; the next call
    /// for the same key computes again.
    pub fn try_get_or_compute<Q, F, E>(&mut self, key: &Q, compute: F) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> Result<V, E>,
        V: Clone,
    {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let value = match compute() {
            Ok(value) => value,
            Err(err) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_compute_error();
                return Err(err);
            },
        };
        Ok(self.insert_new(key.to_owned(), value))
    }

    /// Stores `value` under `key` unless an entry already exists, and returns
    /// the entry that is now cached (the existing one wins).
    ///
    /// This is the write half of a lookup/compute/insert sequence whose
    /// compute ran without holding the cache.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> V
    where
        V: Clone,
    {
        if let Some(existing) = self.map.get(&key) {
            return existing.clone();
        }
        self.insert_new(key, value)
    }

    fn insert_new(&mut self, key: K, value: V) -> V
    where
        V: Clone,
    {
        #[cfg(feature = "metrics")]
        self.metrics.record_insert();

        self.order.push_back(key.clone());
        self.map.insert(key, value.clone());
        self.evict_overflow();
        value
    }

    /// Evicts oldest entries until `len <= capacity`.
    fn evict_overflow(&mut self) {
        let mut evicted = 0usize;
        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
            evicted += 1;
            #[cfg(feature = "metrics")]
            self.metrics.record_evicted_entry();
        }
        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "bounded cache evicted oldest entries");
        }

        #[cfg(debug_assertions)]
        self.validate_invariants();
    }

    /// Removes and returns the oldest entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_front()?;
        let value = self.map.remove(&key).expect("map/order out of sync");
        Some((key, value))
    }

    /// Returns the oldest entry without removing it.
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        let key = self.order.front()?;
        self.map.get(key).map(|value| (key, value))
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    /// Validates internal invariants (debug-only).
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        use crate::error::InvariantError;

        if self.map.len() != self.order.len() {
            return Err(InvariantError::new(format!(
                "map holds {} entries but order queue holds {}",
                self.map.len(),
                self.order.len()
            )));
        }
        if self.map.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "len {} exceeds capacity {}",
                self.map.len(),
                self.capacity
            )));
        }
        if let Some(missing) = self.order.iter().position(|key| !self.map.contains_key(key)) {
            return Err(InvariantError::new(format!(
                "order queue position {} has no map entry",
                missing
            )));
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("bounded cache invariant violated: {}", err);
        }
    }
}

impl<K, V> std::fmt::Debug for BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedValueCache")
            .field("capacity", &self.capacity)
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> ReadOnlyCache for BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    #[inline]
    fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<BoundedMetricsSnapshot> for BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn snapshot(&self) -> BoundedMetricsSnapshot {
        BoundedMetricsSnapshot {
            hits: self.metrics.hits,
            misses: self.metrics.misses,
            inserts: self.metrics.inserts,
            compute_errors: self.metrics.compute_errors,
            evicted_entries: self.metrics.evicted_entries,
            cache_len: self.map.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsReset for BoundedValueCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
