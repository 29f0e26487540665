//! Callable memoizers: a wrapped function plus its cache behind a lock.
//!
//! | Constructor           | Wrapper            | Cache                                   |
//! |-----------------------|--------------------|-----------------------------------------|
//! | [`memoize`]           | [`Memoized`]       | [`IdentityMemoTree`], argument identity |
//! | [`bounded_cache`]     | [`BoundedMemo`]    | [`BoundedValueCache`], value keys, FIFO |
//! | [`memoize_last`]      | [`ShallowMemoized`]| [`LastCall`], one slot, shallow args    |
//! | [`memoize_creator`]   | [`CreatorMemo`]    | bounded, keyed by serialized arguments  |
//!
//! Every wrapper takes `&self`, so one instance can be shared across threads
//! behind an `Arc`. The wrapped function always runs with the lock released:
//!
//! ```text
//!   call(args)
//!     lock ─► lookup ─► unlock          hit  → return cached value
//!     compute(args)                     miss → run with no lock held
//!     lock ─► insert_if_absent ─► unlock
//!                                       first stored value wins; every caller
//!                                       gets that one value back
//! ```
//!
//! Two threads missing on the same key may both compute. Only one result is
//! kept and both callers return it, so a slot never exposes two values.
//! A function that calls back into its own memoizer does not deadlock.

use std::borrow::Borrow;
use std::hash::Hash;
use std::marker::PhantomData;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::arg::Arg;
use crate::bounded::BoundedValueCache;
use crate::builder::DEFAULT_KEY_CAPACITY;
use crate::error::MemoError;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::{BoundedMetricsSnapshot, MemoTreeMetricsSnapshot};
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::shallow::{LastCall, ShallowEq};
use crate::tree::{IdentityMemoTree, SweepStats};

// ============================================================================
// Identity memoizer
// ============================================================================

/// A function memoized by the identity of its arguments.
///
/// ```
/// use std::sync::Arc;
/// use memokit::args;
/// use memokit::arg::Arg;
/// use memokit::memoize::memoize;
///
/// let total = memoize(|args: &[Arg]| {
///     args.iter()
///         .filter_map(|arg| arg.downcast_ref::<Vec<u32>>())
///         .map(|items| items.iter().sum::<u32>())
///         .sum::<u32>()
/// });
///
/// let items = Arc::new(vec![1, 2, 3]);
/// assert_eq!(total.call(&args![&items]).unwrap(), 6);
/// assert_eq!(total.call(&args![&items]).unwrap(), 6);
/// assert_eq!(total.len(), 1);
/// ```
///
/// # Reclamation
///
/// The cache never holds a strong handle to an argument, but it does own
/// every cached value. A value that holds one of its own arguments, as a
/// pass-through `|args| args[0].clone()` does, keeps that argument alive,
/// so its branch survives [`prune`](Self::prune) until [`clear`](Self::clear).
/// Return derived data, or downgrade such references to
/// [`Weak`](std::sync::Weak).
pub struct Memoized<F, V> {
    func: F,
    tree: Mutex<IdentityMemoTree<V>>,
}

impl<F, V> Memoized<F, V> {
    pub fn new(func: F) -> Self {
        Self::with_tree(func, IdentityMemoTree::new())
    }

    /// Wraps `func` around an existing (usually configured) tree.
    pub fn with_tree(func: F, tree: IdentityMemoTree<V>) -> Self {
        Self {
            func,
            tree: Mutex::new(tree),
        }
    }

    /// Sweeps branches of dropped arguments.
    pub fn prune(&self) -> SweepStats {
        self.tree.lock().prune()
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.tree.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.lock().is_empty()
    }

    pub fn clear(&self) {
        self.tree.lock().clear();
    }

    /// Runs `f` against the tree while holding the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&IdentityMemoTree<V>) -> R) -> R {
        f(&self.tree.lock())
    }

    pub fn into_tree(self) -> IdentityMemoTree<V> {
        self.tree.into_inner()
    }
}

impl<F, V> Memoized<F, V>
where
    F: Fn(&[Arg]) -> V,
    V: Clone,
{
    /// Returns the result for `args`, calling the function only on a miss.
    ///
    /// # Errors
    ///
    /// [`MemoError::UnsupportedKeyKind`] if any argument is a scalar.
    pub fn call(&self, args: &[Arg]) -> Result<V, MemoError> {
        let key = {
            let mut tree = self.tree.lock();
            let key = tree.key_for(args)?;
            if let Some(value) = tree.lookup(&key) {
                return Ok(value);
            }
            key
        };

        let value = (self.func)(args);
        Ok(self.tree.lock().insert_if_absent(&key, value))
    }
}

impl<F, V> Memoized<F, V>
where
    V: Clone,
{
    /// Variant of [`call`](Self::call) for functions that can fail.
    ///
    /// A failure is returned unchanged and nothing is cached; the next call
    /// with the same arguments runs the function again.
    pub fn try_call<E>(&self, args: &[Arg]) -> Result<V, E>
    where
        F: Fn(&[Arg]) -> Result<V, E>,
        E: From<MemoError>,
    {
        let key = {
            let mut tree = self.tree.lock();
            let key = tree.key_for(args)?;
            if let Some(value) = tree.lookup(&key) {
                return Ok(value);
            }
            key
        };

        let value = (self.func)(args)?;
        Ok(self.tree.lock().insert_if_absent(&key, value))
    }
}

impl<F, V> std::fmt::Debug for Memoized<F, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("tree", &*self.tree.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "metrics")]
impl<F, V> MetricsSnapshotProvider<MemoTreeMetricsSnapshot> for Memoized<F, V> {
    fn snapshot(&self) -> MemoTreeMetricsSnapshot {
        self.tree.lock().snapshot()
    }
}

/// Wraps `func` in an identity memoizer with the default prune interval.
///
/// Results that hold strong handles to their own arguments pin those
/// arguments; see [`Memoized`] for details.
pub fn memoize<F, V>(func: F) -> Memoized<F, V>
where
    F: Fn(&[Arg]) -> V,
    V: Clone,
{
    Memoized::new(func)
}

// ============================================================================
// Bounded value-keyed cache
// ============================================================================

/// Shared, lock-protected [`BoundedValueCache`].
///
/// ```
/// use memokit::memoize::bounded_cache;
///
/// let paths = bounded_cache::<String, Vec<String>>(2).unwrap();
/// let split = |path: &str| path.split('.').map(String::from).collect::<Vec<_>>();
///
/// assert_eq!(paths.get_or_compute("a.b", || split("a.b")).len(), 2);
/// paths.get_or_compute("c", || split("c"));
/// paths.get_or_compute("d.e.f", || split("d.e.f"));
/// assert_eq!(paths.len(), 2);
/// assert!(!paths.contains("a.b"));
/// ```
pub struct BoundedMemo<K, V>
where
    K: Clone + Eq + Hash,
{
    cache: Mutex<BoundedValueCache<K, V>>,
}

impl<K, V> BoundedMemo<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, MemoError> {
        Ok(Self::from_cache(BoundedValueCache::new(capacity)?))
    }

    pub fn from_cache(cache: BoundedValueCache<K, V>) -> Self {
        Self {
            cache: Mutex::new(cache),
        }
    }

    pub fn get_or_compute<Q, F>(&self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> V,
    {
        match self.try_get_or_compute::<Q, _, std::convert::Infallible>(key, || Ok(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    pub fn try_get_or_compute<Q, F, E>(&self, key: &Q, compute: F) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.cache.lock().lookup(key) {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.cache.lock().insert_if_absent(key.to_owned(), value))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().get(key).cloned()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn into_cache(self) -> BoundedValueCache<K, V> {
        self.cache.into_inner()
    }
}

impl<K, V> std::fmt::Debug for BoundedMemo<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedMemo")
            .field("cache", &*self.cache.lock())
            .finish()
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<BoundedMetricsSnapshot> for BoundedMemo<K, V>
where
    K: Clone + Eq + Hash,
{
    fn snapshot(&self) -> BoundedMetricsSnapshot {
        self.cache.lock().snapshot()
    }
}

/// Creates a shared bounded cache holding at most `capacity` entries.
///
/// # Errors
///
/// [`MemoError::InvalidCapacity`] if `capacity` is 0.
pub fn bounded_cache<K, V>(capacity: usize) -> Result<BoundedMemo<K, V>, MemoError>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    BoundedMemo::new(capacity)
}

// ============================================================================
// Shallow single-slot memoizer
// ============================================================================

/// A function that remembers only its latest call, compared shallowly.
///
/// ```
/// use memokit::memoize::memoize_last;
///
/// let label = memoize_last(|(id, name): &(u32, String)| format!("{id}:{name}"));
/// let first = label.call((1, "a".to_string()));
/// let again = label.call((1, "a".to_string()));
/// assert_eq!(first, again);
/// ```
pub struct ShallowMemoized<F, A, R> {
    func: F,
    last: Mutex<LastCall<A, R>>,
}

impl<F, A, R> ShallowMemoized<F, A, R>
where
    A: ShallowEq,
    R: Clone,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            last: Mutex::new(LastCall::new()),
        }
    }

    /// Returns the stored result when `args` shallow-equals the previous
    /// call's arguments, otherwise runs the function and replaces the slot.
    pub fn call(&self, args: A) -> R
    where
        F: Fn(&A) -> R,
    {
        if let Some(result) = self.last.lock().get(&args) {
            return result.clone();
        }
        trace!("shallow memo miss");
        let result = (self.func)(&args);
        self.last.lock().store(args, result.clone());
        result
    }

    /// Variant of [`call`](Self::call) for functions that can fail. A
    /// failure leaves the previous slot in place.
    pub fn try_call<E>(&self, args: A) -> Result<R, E>
    where
        F: Fn(&A) -> Result<R, E>,
    {
        if let Some(result) = self.last.lock().get(&args) {
            return Ok(result.clone());
        }
        trace!("shallow memo miss");
        let result = (self.func)(&args)?;
        self.last.lock().store(args, result.clone());
        Ok(result)
    }

    pub fn clear(&self) {
        self.last.lock().clear();
    }
}

impl<F, A, R> std::fmt::Debug for ShallowMemoized<F, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShallowMemoized").finish_non_exhaustive()
    }
}

pub fn memoize_last<F, A, R>(func: F) -> ShallowMemoized<F, A, R>
where
    F: Fn(&A) -> R,
    A: ShallowEq,
    R: Clone,
{
    ShallowMemoized::new(func)
}

// ============================================================================
// Creator memoizer
// ============================================================================

/// Memoizes a "creator" (a function building a selector or other value from
/// configuration arguments) by the JSON serialization of its arguments.
///
/// Equal serialized arguments share one created value until it is evicted.
///
/// ```
/// use std::sync::Arc;
/// use memokit::memoize::memoize_creator;
///
/// let make = memoize_creator(|(field, limit): &(String, usize)| {
///     Arc::new(format!("top {limit} by {field}"))
/// });
/// let a = make.call(&("score".to_string(), 10)).unwrap();
/// let b = make.call(&("score".to_string(), 10)).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub struct CreatorMemo<F, A: ?Sized, R> {
    creator: F,
    created: Mutex<BoundedValueCache<String, R>>,
    _args: PhantomData<fn(&A)>,
}

impl<F, A, R> CreatorMemo<F, A, R>
where
    F: Fn(&A) -> R,
    A: Serialize + ?Sized,
    R: Clone,
{
    /// Uses [`DEFAULT_KEY_CAPACITY`].
    pub fn new(creator: F) -> Self {
        Self {
            creator,
            created: Mutex::new(
                BoundedValueCache::new(DEFAULT_KEY_CAPACITY)
                    .expect("default key capacity is non-zero"),
            ),
            _args: PhantomData,
        }
    }

    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if `capacity` is 0.
    pub fn with_capacity(creator: F, capacity: usize) -> Result<Self, MemoError> {
        Ok(Self {
            creator,
            created: Mutex::new(BoundedValueCache::new(capacity)?),
            _args: PhantomData,
        })
    }

    /// Returns the value created for arguments serializing like `args`.
    ///
    /// # Errors
    ///
    /// [`MemoError::KeySerialization`] if `args` cannot be serialized; the
    /// creator is not called in that case.
    pub fn call(&self, args: &A) -> Result<R, MemoError> {
        let key = serde_json::to_string(args)?;
        if let Some(created) = self.created.lock().lookup(key.as_str()) {
            return Ok(created);
        }
        trace!(key = %key, "creating for new arguments");
        let created = (self.creator)(args);
        Ok(self.created.lock().insert_if_absent(key, created))
    }

    pub fn len(&self) -> usize {
        self.created.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.created.lock().capacity()
    }

    pub fn clear(&self) {
        self.created.lock().clear();
    }
}

impl<F, A: ?Sized, R> std::fmt::Debug for CreatorMemo<F, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatorMemo")
            .field("created", &*self.created.lock())
            .finish_non_exhaustive()
    }
}

pub fn memoize_creator<F, A, R>(creator: F) -> CreatorMemo<F, A, R>
where
    F: Fn(&A) -> R,
    A: Serialize + ?Sized,
    R: Clone,
{
    CreatorMemo::new(creator)
}
