//! Canonical argument lists for identity keying.
//!
//! Selectors are conventionally called as `(state, props, extra, ...rest)`,
//! with any of the leading positions possibly unset. Normalization makes
//! every call shape that should share a cache slot produce the same key
//! path, and every shape that should not produce a different one:
//!
//! ```text
//!   raw call                       normalized key path
//!   ─────────────────────────────  ─────────────────────────────────
//!   (s)                            [s]
//!   (s, Unset)                     [s]               trailing unset dropped
//!   (s, Unset, x)                  [s, Secondary, x]
//!   (Unset, p)                     [Primary, p]
//!   (s, p, Unset, Unset, r)        [s, p, Tertiary, Unset, r]
//!   ()                             []
//! ```
//!
//! Only positions 0..=2 receive a position-specific [`Absent`] sentinel.
//! An unset position past index 2 that is followed by a set one passes
//! through as [`KeyPart::Unset`].

use std::fmt;

use crate::arg::{Arg, Handle, Scalar, handle_addr};

/// Marker substituted for an unset leading position that is followed by a
/// set one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Absent {
    /// Unset position 0 (state).
    Primary,
    /// Unset position 1 (props).
    Secondary,
    /// Unset position 2 (extra).
    Tertiary,
}

impl Absent {
    /// Sentinel for `position`, if that position is disambiguated.
    #[inline]
    pub const fn for_position(position: usize) -> Option<Absent> {
        match position {
            0 => Some(Absent::Primary),
            1 => Some(Absent::Secondary),
            2 => Some(Absent::Tertiary),
            _ => None,
        }
    }

    /// Position this sentinel stands in for.
    #[inline]
    pub const fn position(self) -> usize {
        match self {
            Absent::Primary => 0,
            Absent::Secondary => 1,
            Absent::Tertiary => 2,
        }
    }
}

/// One position of a normalized argument list.
#[derive(Clone)]
pub enum KeyPart {
    Ref(Handle),
    Absent(Absent),
    /// Unset position past the disambiguated prefix.
    Unset,
    Scalar(Scalar),
}

impl KeyPart {
    /// Identity comparison, matching [`Arg::same_identity`].
    pub fn same_identity(&self, other: &KeyPart) -> bool {
        match (self, other) {
            (KeyPart::Ref(a), KeyPart::Ref(b)) => handle_addr(a) == handle_addr(b),
            (KeyPart::Absent(a), KeyPart::Absent(b)) => a == b,
            (KeyPart::Unset, KeyPart::Unset) => true,
            (KeyPart::Scalar(a), KeyPart::Scalar(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Ref(handle) => write!(f, "Ref({:#x})", handle_addr(handle)),
            KeyPart::Absent(absent) => write!(f, "Absent({absent:?})"),
            KeyPart::Unset => f.write_str("Unset"),
            KeyPart::Scalar(scalar) => f.debug_tuple("Scalar").field(scalar).finish(),
        }
    }
}

/// Argument list in canonical form.
///
/// Invariant: never ends in [`KeyPart::Unset`], and never holds
/// `KeyPart::Unset` at positions 0..=2.
#[derive(Debug, Clone, Default)]
pub struct NormalizedArgs(Vec<KeyPart>);

impl NormalizedArgs {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyPart> {
        self.0.iter()
    }

    /// `true` if both lists are the same key (same length, identical parts).
    pub fn same_key(&self, other: &NormalizedArgs) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.same_identity(b))
    }
}

impl IntoIterator for NormalizedArgs {
    type Item = KeyPart;
    type IntoIter = std::vec::IntoIter<KeyPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NormalizedArgs {
    type Item = &'a KeyPart;
    type IntoIter = std::slice::Iter<'a, KeyPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Converts a raw argument list into its canonical key form.
///
/// Pure and total: trailing unset positions are dropped, unset positions
/// 0..=2 that precede a set position become their [`Absent`] sentinel, and
/// everything else is passed through.
///
/// ```
/// use std::sync::Arc;
/// use memokit::arg::Arg;
/// use memokit::normalize::{normalize, Absent, KeyPart};
///
/// let props = Arc::new("props");
/// let key = normalize(&[Arg::Unset, Arg::from(&props), Arg::Unset]);
/// assert_eq!(key.len(), 2);
/// assert!(matches!(key.as_slice()[0], KeyPart::Absent(Absent::Primary)));
/// ```
pub fn normalize(args: &[Arg]) -> NormalizedArgs {
    let end = args
        .iter()
        .rposition(|arg| !arg.is_unset())
        .map_or(0, |last| last + 1);

    let parts = args[..end]
        .iter()
        .enumerate()
        .map(|(position, arg)| match arg {
            Arg::Ref(handle) => KeyPart::Ref(Handle::clone(handle)),
            Arg::Scalar(scalar) => KeyPart::Scalar(scalar.clone()),
            Arg::Unset => Absent::for_position(position).map_or(KeyPart::Unset, KeyPart::Absent),
        })
        .collect();

    NormalizedArgs(parts)
}
