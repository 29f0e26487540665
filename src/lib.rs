//! memokit: identity-keyed memoization for derived-data functions.
//!
//! A memoized function returns the same result for the same arguments
//! without recomputing. "Same" here means the same argument allocations in
//! the same order. Three cache strategies are provided:
//!
//! - [`tree::IdentityMemoTree`]: unbounded, keyed by argument identity over
//!   lists of any length, swept as arguments are dropped;
//! - [`bounded::BoundedValueCache`]: FIFO-bounded, keyed by value;
//! - [`shallow::LastCall`]: one slot, matched by shallow equality.
//!
//! [`memoize`] wraps each of these around a function for shared use, and
//! [`builder::MemoBuilder`] holds their configuration.

pub mod arg;
pub mod bounded;
pub mod builder;
pub mod ds;
pub mod error;
pub mod interner;
pub mod memoize;
pub mod normalize;
pub mod shallow;
pub mod traits;
pub mod tree;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
