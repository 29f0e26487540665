//! # Shared cache traits
//!
//! ```text
//!   ┌─────────────────────────────────────┐
//!   │           ReadOnlyCache             │
//!   │                                     │
//!   │  len(&) → usize                     │
//!   │  is_empty(&) → bool                 │
//!   │  capacity(&) → Option<usize>        │
//!   └──────────────────┬──────────────────┘
//!                      │
//!        ┌─────────────┴──────────────┐
//!        ▼                            ▼
//!   BoundedValueCache            IdentityMemoTree
//!   Some(capacity)               None (unbounded, swept)
//! ```
//!
//! The memo caches share only inspection: how they are keyed (identity
//! paths vs. value keys) and how they are filled differ too much for a
//! common insert/get surface.

/// Read-only inspection of a memo cache.
///
/// # Example
///
/// ```
/// use memokit::bounded::BoundedValueCache;
/// use memokit::traits::ReadOnlyCache;
/// use memokit::tree::IdentityMemoTree;
///
/// fn describe(cache: &dyn ReadOnlyCache) -> String {
///     match cache.capacity() {
///         Some(cap) => format!("{}/{}", cache.len(), cap),
///         None => format!("{}/unbounded", cache.len()),
///     }
/// }
///
/// let bounded: BoundedValueCache<String, u8> = BoundedValueCache::new(4).unwrap();
/// let tree: IdentityMemoTree<u8> = IdentityMemoTree::new();
/// assert_eq!(describe(&bounded), "0/4");
/// assert_eq!(describe(&tree), "0/unbounded");
/// ```
pub trait ReadOnlyCache {
    /// Number of cached values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached values, `None` when the cache is not
    /// capacity-bounded.
    fn capacity(&self) -> Option<usize>;
}
