//! Error types for the memokit library.
//!
//! ## Key Components
//!
//! - [`MemoError`]: Returned by the memoization layer itself: a key that
//!   cannot be identity-keyed, a zero capacity, or a key that failed to
//!   serialize.
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants` methods).
//!
//! Failures of the wrapped computation are never wrapped in [`MemoError`].
//! Fallible entry points are generic over the caller's error type and only
//! require `E: From<MemoError>`, so both kinds travel on one `?` path.
//!
//! ## Example Usage
//!
//! ```
//! use memokit::bounded::BoundedValueCache;
//! use memokit::error::MemoError;
//!
//! let cache: Result<BoundedValueCache<String, i32>, MemoError> = BoundedValueCache::new(0);
//! assert!(matches!(cache, Err(MemoError::InvalidCapacity { capacity: 0 })));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// MemoError
// ---------------------------------------------------------------------------

/// Errors raised by the memoization layer.
#[derive(Debug, Error)]
pub enum MemoError {
    /// A scalar argument reached an identity-keyed cache.
    ///
    /// Scalars have no stable identity to hold weakly. Cache them by value
    /// through [`CreatorMemo`](crate::memoize::CreatorMemo) or a
    /// [`BoundedValueCache`](crate::bounded::BoundedValueCache) instead.
    #[error("argument {position} is a {kind} scalar and cannot be used as an identity key")]
    UnsupportedKeyKind { position: usize, kind: &'static str },

    /// A bounded cache was configured with a capacity below 1.
    #[error("capacity must be at least 1, got {capacity}")]
    InvalidCapacity { capacity: usize },

    /// A value-keyed cache could not serialize its key.
    #[error("failed to serialize cache key: {0}")]
    KeySerialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by debug-only `check_invariants` methods (e.g.
/// [`IdentityMemoTree::check_invariants`](crate::tree::IdentityMemoTree::check_invariants)).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- MemoError --------------------------------------------------------

    #[test]
    fn unsupported_key_display_names_position_and_kind() {
        let err = MemoError::UnsupportedKeyKind {
            position: 0,
            kind: "integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("argument 0"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn invalid_capacity_display_shows_value() {
        let err = MemoError::InvalidCapacity { capacity: 0 };
        assert_eq!(err.to_string(), "capacity must be at least 1, got 0");
    }

    #[test]
    fn serialization_error_converts_via_from() {
        let json_err = serde_json::from_str::<u8>("not json").unwrap_err();
        let err: MemoError = json_err.into();
        assert!(matches!(err, MemoError::KeySerialization(_)));
        assert!(err.to_string().starts_with("failed to serialize cache key"));
    }

    #[test]
    fn memo_error_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<MemoError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("leaf count mismatch");
        assert_eq!(err.to_string(), "leaf count mismatch");
    }

    #[test]
    fn invariant_message_accessor() {
        let err = InvariantError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
