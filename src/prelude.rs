pub use crate::arg::{Arg, Handle, Scalar};
pub use crate::bounded::BoundedValueCache;
pub use crate::builder::{
    DEFAULT_KEY_CAPACITY, DEFAULT_OPTIONS_CAPACITY, DEFAULT_PRUNE_INTERVAL, MemoBuilder,
};
pub use crate::error::MemoError;
pub use crate::interner::OptionsInterner;
pub use crate::memoize::{
    BoundedMemo, CreatorMemo, Memoized, ShallowMemoized, bounded_cache, memoize, memoize_creator,
    memoize_last,
};
pub use crate::normalize::{Absent, KeyPart, NormalizedArgs, normalize};
pub use crate::shallow::{LastCall, ShallowEq};
pub use crate::traits::ReadOnlyCache;
pub use crate::tree::{IdentityMemoTree, MemoKey, SweepStats};
pub use crate::{args, impl_shallow_eq};

#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::{BoundedMetricsSnapshot, MemoTreeMetricsSnapshot};
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider};
