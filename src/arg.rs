//! Call arguments compared by identity.
//!
//! A memoized call receives an ordered list of [`Arg`]s. Reference arguments
//! are [`Handle`]s (`Arc<dyn Any + Send + Sync>`) and two arguments are the
//! same key only when they point at the same allocation. Structurally equal
//! values in different allocations are different keys.
//!
//! ```
//! use std::sync::Arc;
//! use memokit::arg::Arg;
//!
//! let state = Arc::new(vec![1, 2, 3]);
//! let a = Arg::from(&state);
//! let b = Arg::from(&state);
//! let c = Arg::new(vec![1, 2, 3]);
//!
//! assert!(a.same_identity(&b));
//! assert!(!a.same_identity(&c));
//! assert_eq!(a.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::Serialize;

/// Shared, type-erased argument object.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// Weak counterpart of [`Handle`]; does not keep the argument value alive.
pub type WeakHandle = Weak<dyn Any + Send + Sync>;

/// Address of a handle's allocation, used as its identity.
#[inline]
pub(crate) fn handle_addr(handle: &Handle) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// Non-reference argument value.
///
/// Scalars have no allocation identity. Identity-keyed caches reject them
/// with [`MemoError::UnsupportedKeyKind`](crate::error::MemoError::UnsupportedKeyKind);
/// value-keyed caches serialize them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Short name of the scalar's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
        }
    }
}

/// One positional argument of a memoized call.
#[derive(Clone, Default)]
pub enum Arg {
    /// Argument not supplied, or supplied as explicitly absent.
    #[default]
    Unset,
    /// Reference argument, keyed by allocation identity.
    Ref(Handle),
    /// Non-reference argument.
    Scalar(Scalar),
}

impl Arg {
    /// Allocates `value` and wraps the new handle.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Arg::Ref(Arc::new(value))
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Arg::Unset)
    }

    /// Returns the handle for reference arguments.
    #[inline]
    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Arg::Ref(handle) => Some(handle),
            _ => None,
        }
    }

    /// Borrows the referenced value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_handle().and_then(|handle| handle.downcast_ref::<T>())
    }

    /// Returns a typed `Arc` to the referenced value if it is a `T`.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_handle()
            .and_then(|handle| Arc::clone(handle).downcast::<T>().ok())
    }

    /// Identity comparison: same allocation for references, equal value for
    /// scalars, and `Unset` only matches `Unset`.
    pub fn same_identity(&self, other: &Arg) -> bool {
        match (self, other) {
            (Arg::Unset, Arg::Unset) => true,
            (Arg::Ref(a), Arg::Ref(b)) => handle_addr(a) == handle_addr(b),
            (Arg::Scalar(a), Arg::Scalar(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Unset => f.write_str("Unset"),
            Arg::Ref(handle) => write!(f, "Ref({:#x})", handle_addr(handle)),
            Arg::Scalar(scalar) => f.debug_tuple("Scalar").field(scalar).finish(),
        }
    }
}

impl<T: Any + Send + Sync> From<Arc<T>> for Arg {
    fn from(value: Arc<T>) -> Self {
        Arg::Ref(value)
    }
}

impl<T: Any + Send + Sync> From<&Arc<T>> for Arg {
    fn from(value: &Arc<T>) -> Self {
        Arg::Ref(Arc::clone(value) as Handle)
    }
}

impl<T> From<Option<T>> for Arg
where
    T: Into<Arg>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Unset, Into::into)
    }
}

impl From<Scalar> for Arg {
    fn from(value: Scalar) -> Self {
        Arg::Scalar(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Scalar(Scalar::Str(value.to_owned()))
    }
}

/// Builds a `Vec<Arg>` from heterogeneous values.
///
/// ```
/// use std::sync::Arc;
/// use memokit::args;
/// use memokit::arg::Arg;
///
/// let state = Arc::new(1u8);
/// let list = args![&state, Arg::Unset, 3i64];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::arg::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::arg::Arg::from($value)),+]
    };
}
