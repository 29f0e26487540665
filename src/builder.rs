//! Configuration for every memo cache in the crate.
//!
//! All tunables live on [`MemoBuilder`]; there is no global state. Defaults:
//!
//! | Setting            | Default                      | Used by                              |
//! |--------------------|------------------------------|--------------------------------------|
//! | `capacity`         | [`DEFAULT_KEY_CAPACITY`]     | bounded caches, creator memoizers    |
//! | `options_capacity` | [`DEFAULT_OPTIONS_CAPACITY`] | options interner                     |
//! | `prune_interval`   | [`DEFAULT_PRUNE_INTERVAL`]   | identity trees (`0` = manual only)   |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use memokit::args;
//! use memokit::arg::Arg;
//! use memokit::builder::MemoBuilder;
//!
//! let builder = MemoBuilder::new().capacity(64).prune_interval(0);
//!
//! let mut paths = builder.try_build_bounded::<String, usize>().unwrap();
//! assert_eq!(paths.capacity(), 64);
//! paths.get_or_compute("a.b.c", || 3);
//!
//! let count = builder.memoize(|args: &[Arg]| args.len());
//! let state = Arc::new(());
//! assert_eq!(count.call(&args![&state]).unwrap(), 1);
//! ```

use std::hash::Hash;

use serde::Serialize;

use crate::arg::Arg;
use crate::bounded::BoundedValueCache;
use crate::error::MemoError;
use crate::interner::OptionsInterner;
use crate::memoize::{BoundedMemo, CreatorMemo, Memoized};
use crate::tree::IdentityMemoTree;

/// Entries kept by value-keyed caches before the oldest is evicted.
pub const DEFAULT_KEY_CAPACITY: usize = 512;

/// Option sets kept by an [`OptionsInterner`].
pub const DEFAULT_OPTIONS_CAPACITY: usize = 100;

/// Inserts between full sweeps of an [`IdentityMemoTree`].
pub const DEFAULT_PRUNE_INTERVAL: usize = 1024;

/// Builder for memo caches and memoized functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoBuilder {
    capacity: usize,
    options_capacity: usize,
    prune_interval: usize,
}

impl MemoBuilder {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_KEY_CAPACITY,
            options_capacity: DEFAULT_OPTIONS_CAPACITY,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }

    /// Capacity of bounded caches and creator memoizers. Validated on build.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Capacity of options interners. Validated on build.
    pub fn options_capacity(mut self, options_capacity: usize) -> Self {
        self.options_capacity = options_capacity;
        self
    }

    /// Inserts between full tree sweeps; `0` disables automatic sweeps.
    pub fn prune_interval(mut self, prune_interval: usize) -> Self {
        self.prune_interval = prune_interval;
        self
    }

    pub fn build_tree<V>(&self) -> IdentityMemoTree<V> {
        IdentityMemoTree::with_prune_interval(self.prune_interval)
    }

    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if the configured capacity is 0.
    pub fn try_build_bounded<K, V>(&self) -> Result<BoundedValueCache<K, V>, MemoError>
    where
        K: Clone + Eq + Hash,
    {
        BoundedValueCache::new(self.capacity)
    }

    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if the configured options capacity is 0.
    pub fn try_build_interner<T>(&self) -> Result<OptionsInterner<T>, MemoError>
    where
        T: Serialize,
    {
        OptionsInterner::new(self.options_capacity)
    }

    /// Memoizes `func` by argument identity over a configured tree.
    pub fn memoize<F, V>(&self, func: F) -> Memoized<F, V>
    where
        F: Fn(&[Arg]) -> V,
        V: Clone,
    {
        Memoized::with_tree(func, self.build_tree())
    }

    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if the configured capacity is 0.
    pub fn try_bounded_memo<K, V>(&self) -> Result<BoundedMemo<K, V>, MemoError>
    where
        K: Clone + Eq + Hash,
        V: Clone,
    {
        Ok(BoundedMemo::from_cache(self.try_build_bounded()?))
    }

    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if the configured capacity is 0.
    pub fn try_memoize_creator<F, A, R>(&self, creator: F) -> Result<CreatorMemo<F, A, R>, MemoError>
    where
        F: Fn(&A) -> R,
        A: Serialize + ?Sized,
        R: Clone,
    {
        CreatorMemo::with_capacity(creator, self.capacity)
    }
}

impl Default for MemoBuilder {
    fn default() -> Self {
        Self::new()
    }
}
