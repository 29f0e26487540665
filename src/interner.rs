//! Stable identity handles for value-equal option sets.
//!
//! An identity-keyed cache misses whenever a caller rebuilds an option set
//! that is equal to one it has seen. [`OptionsInterner`] serializes each
//! option set to JSON and hands back the same `Arc` for every equal set, so
//! the handle can be passed on to an
//! [`IdentityMemoTree`](crate::tree::IdentityMemoTree) as an argument.
//!
//! ```text
//!   intern(opts) ──► serde_json::to_string ──► BoundedValueCache<String, Arc<T>>
//!                                                 hit  → existing Arc
//!                                                 miss → Arc::new(opts), may evict oldest
//! ```
//!
//! Interned handles are held strongly until evicted. An evicted option set
//! receives a fresh handle the next time it is interned, which makes any
//! tree branch keyed by the old handle unreachable once callers drop it.

use std::sync::Arc;

use serde::Serialize;

use crate::bounded::BoundedValueCache;
use crate::builder::DEFAULT_OPTIONS_CAPACITY;
use crate::error::MemoError;
use crate::traits::ReadOnlyCache;

/// FIFO-bounded map from serialized options to a shared handle.
///
/// ```
/// use std::sync::Arc;
/// use memokit::interner::OptionsInterner;
///
/// let mut interner = OptionsInterner::new(16).unwrap();
/// let a = interner.intern(vec!["open", "mine"]).unwrap();
/// let b = interner.intern(vec!["open", "mine"]).unwrap();
/// let c = interner.intern(vec!["closed"]).unwrap();
///
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Debug)]
pub struct OptionsInterner<T> {
    handles: BoundedValueCache<String, Arc<T>>,
}

impl<T> OptionsInterner<T>
where
    T: Serialize,
{
    /// # Errors
    ///
    /// [`MemoError::InvalidCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, MemoError> {
        Ok(Self {
            handles: BoundedValueCache::new(capacity)?,
        })
    }

    /// Returns the handle for `options`, creating one on first sight.
    ///
    /// # Errors
    ///
    /// [`MemoError::KeySerialization`] if `options` cannot be serialized.
    pub fn intern(&mut self, options: T) -> Result<Arc<T>, MemoError> {
        let key = serde_json::to_string(&options)?;
        Ok(self
            .handles
            .get_or_compute(key.as_str(), || Arc::new(options)))
    }

    /// Handle already interned for `options`, if any.
    pub fn get(&self, options: &T) -> Result<Option<Arc<T>>, MemoError> {
        let key = serde_json::to_string(options)?;
        Ok(self.handles.get(key.as_str()).cloned())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.handles.capacity()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

impl<T> Default for OptionsInterner<T>
where
    T: Serialize,
{
    fn default() -> Self {
        Self {
            handles: BoundedValueCache::new(DEFAULT_OPTIONS_CAPACITY)
                .expect("default options capacity is non-zero"),
        }
    }
}

impl<T> ReadOnlyCache for OptionsInterner<T>
where
    T: Serialize,
{
    #[inline]
    fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        Some(self.handles.capacity())
    }
}
