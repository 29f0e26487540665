//! Single-slot memoization under shallow equality.
//!
//! [`LastCall`] keeps only the most recent argument list and its result. A
//! call whose arguments are [`ShallowEq`] to the stored ones returns the
//! stored result; anything else recomputes and replaces the slot.
//!
//! Unlike [`IdentityMemoTree`](crate::tree::IdentityMemoTree), a freshly
//! built argument value with the same fields hits:
//!
//! ```
//! use std::sync::Arc;
//! use memokit::impl_shallow_eq;
//! use memokit::shallow::LastCall;
//!
//! #[derive(Clone)]
//! struct Props {
//!     id: u32,
//!     theme: Arc<String>,
//! }
//! impl_shallow_eq!(Props { id, theme });
//!
//! let theme = Arc::new(String::from("dark"));
//! let mut last = LastCall::new();
//! let mut calls = 0;
//!
//! for _ in 0..3 {
//!     let props = Props { id: 1, theme: Arc::clone(&theme) };
//!     last.call(props, |p| { calls += 1; p.id * 10 });
//! }
//! assert_eq!(calls, 1);
//! ```
//!
//! "Shallow" means one level of structure per argument: scalar fields compare
//! by value, shared references (`Arc`, `Rc`) compare by pointer identity, and
//! containers (`Option`, tuples, `Vec`, arrays) are transparent.

use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::arg::Arg;

/// Equality one level deep.
///
/// Implemented for scalars, strings, shared pointers (by identity),
/// transparent containers and [`Arg`]. Use [`impl_shallow_eq!`] for structs.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

shallow_eq_by_value!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    String,
    str,
    &'static str,
);

// Float fields follow value equality, so NaN never matches.
shallow_eq_by_value!(f32, f64);

impl<T: ?Sized> ShallowEq for Arc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> ShallowEq for Rc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Box<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        (**self).shallow_eq(&**other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.shallow_eq(b))
    }
}

impl<T: ShallowEq> ShallowEq for Vec<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<T: ShallowEq, const N: usize> ShallowEq for [T; N] {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl ShallowEq for Arg {
    /// References by identity, scalars by value.
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

macro_rules! shallow_eq_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ShallowEq),+> ShallowEq for ($($name,)+) {
            #[inline]
            fn shallow_eq(&self, other: &Self) -> bool {
                true $(&& self.$idx.shallow_eq(&other.$idx))+
            }
        }
    };
}

shallow_eq_tuple!(A: 0);
shallow_eq_tuple!(A: 0, B: 1);
shallow_eq_tuple!(A: 0, B: 1, C: 2);
shallow_eq_tuple!(A: 0, B: 1, C: 2, D: 3);
shallow_eq_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
shallow_eq_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Implements [`ShallowEq`] for a struct by comparing the listed fields.
///
/// ```
/// use memokit::impl_shallow_eq;
/// use memokit::shallow::ShallowEq;
///
/// struct Filter { kind: String, limit: usize }
/// impl_shallow_eq!(Filter { kind, limit });
///
/// let a = Filter { kind: "open".into(), limit: 5 };
/// let b = Filter { kind: "open".into(), limit: 5 };
/// assert!(a.shallow_eq(&b));
/// ```
#[macro_export]
macro_rules! impl_shallow_eq {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::shallow::ShallowEq for $ty {
            fn shallow_eq(&self, other: &Self) -> bool {
                true $(&& $crate::shallow::ShallowEq::shallow_eq(&self.$field, &other.$field))*
            }
        }
    };
}

/// One-slot cache of the most recent call.
#[derive(Debug)]
pub struct LastCall<A, R> {
    last: Option<(A, R)>,
}

impl<A, R> LastCall<A, R>
where
    A: ShallowEq,
    R: Clone,
{
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Returns the stored result if `args` is shallow-equal to the stored
    /// arguments, otherwise computes, stores and returns a new one.
    pub fn call<F>(&mut self, args: A, compute: F) -> R
    where
        F: FnOnce(&A) -> R,
    {
        match self.try_call(args, |args| Ok::<R, std::convert::Infallible>(compute(args))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`call`](Self::call). On failure the previous
    /// slot is kept.
    pub fn try_call<F, E>(&mut self, args: A, compute: F) -> Result<R, E>
    where
        F: FnOnce(&A) -> Result<R, E>,
    {
        if let Some(result) = self.get(&args) {
            return Ok(result.clone());
        }
        trace!("shallow memo miss");
        let result = compute(&args)?;
        self.last = Some((args, result.clone()));
        Ok(result)
    }

    /// Stored result for `args`, if the slot matches.
    pub fn get(&self, args: &A) -> Option<&R> {
        self.last
            .as_ref()
            .filter(|(last, _)| last.shallow_eq(args))
            .map(|(_, result)| result)
    }

    /// Overwrites the slot.
    pub fn store(&mut self, args: A, result: R) {
        self.last = Some((args, result));
    }

    pub fn last_args(&self) -> Option<&A> {
        self.last.as_ref().map(|(args, _)| args)
    }

    pub fn last_result(&self) -> Option<&R> {
        self.last.as_ref().map(|(_, result)| result)
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.last.is_some()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

impl<A, R> Default for LastCall<A, R>
where
    A: ShallowEq,
    R: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone)]
    struct Obj {
        a: i64,
    }
    crate::impl_shallow_eq!(Obj { a });

    #[derive(Debug, Clone)]
    struct Wrapper {
        inner: Arc<Vec<u8>>,
        label: &'static str,
    }
    crate::impl_shallow_eq!(Wrapper { inner, label });

    mod shallow_eq {
        use super::*;

        #[test]
        fn scalars_compare_by_value() {
            assert!(1u32.shallow_eq(&1));
            assert!(!1u32.shallow_eq(&2));
            assert!(String::from("x").shallow_eq(&String::from("x")));
            assert!(!f64::NAN.shallow_eq(&f64::NAN));
        }

        #[test]
        fn shared_pointers_compare_by_identity() {
            let a = Arc::new(vec![1u8]);
            let b = Arc::new(vec![1u8]);
            assert!(a.shallow_eq(&Arc::clone(&a)));
            assert!(!a.shallow_eq(&b));

            let r = Rc::new(1);
            assert!(r.shallow_eq(&Rc::clone(&r)));
            assert!(!r.shallow_eq(&Rc::new(1)));
        }

        #[test]
        fn nested_reference_fields_are_not_deep_compared() {
            let first = Wrapper {
                inner: Arc::new(vec![1]),
                label: "x",
            };
            let rebuilt = Wrapper {
                inner: Arc::new(vec![1]),
                label: "x",
            };
            let shared = Wrapper {
                inner: Arc::clone(&first.inner),
                label: "x",
            };
            assert!(!first.shallow_eq(&rebuilt));
            assert!(first.shallow_eq(&shared));
        }

        #[test]
        fn containers_are_transparent() {
            assert!(Some(Obj { a: 1 }).shallow_eq(&Some(Obj { a: 1 })));
            assert!(!Some(Obj { a: 1 }).shallow_eq(&None));
            assert!(vec![1, 2].shallow_eq(&vec![1, 2]));
            assert!(!vec![1, 2].shallow_eq(&vec![1]));
            assert!([Obj { a: 3 }].shallow_eq(&[Obj { a: 3 }]));
            assert!((1u8, Obj { a: 2 }).shallow_eq(&(1u8, Obj { a: 2 })));
            assert!(!(1u8, Obj { a: 2 }).shallow_eq(&(1u8, Obj { a: 3 })));
        }

        #[test]
        fn args_use_identity_for_refs() {
            let handle = Arc::new(1u8);
            assert!(Arg::from(&handle).shallow_eq(&Arg::from(&handle)));
            assert!(!Arg::from(&handle).shallow_eq(&Arg::new(1u8)));
            assert!(Arg::from(3i64).shallow_eq(&Arg::from(3i64)));
            assert!(Arg::Unset.shallow_eq(&Arg::Unset));
        }
    }

    mod last_call {
        use super::*;

        #[test]
        fn equal_fresh_object_hits() {
            let mut last = LastCall::new();
            let calls = Cell::new(0);
            let f = |o: &Obj| {
                calls.set(calls.get() + 1);
                o.a * 2
            };

            assert_eq!(last.call(Obj { a: 1 }, f), 2);
            assert_eq!(last.call(Obj { a: 1 }, f), 2);
            assert_eq!(calls.get(), 1);

            assert_eq!(last.call(Obj { a: 2 }, f), 4);
            assert_eq!(calls.get(), 2);
        }

        #[test]
        fn only_the_latest_call_is_remembered() {
            let mut last = LastCall::new();
            let calls = Cell::new(0);
            let f = |o: &Obj| {
                calls.set(calls.get() + 1);
                o.a
            };
            last.call(Obj { a: 1 }, f);
            last.call(Obj { a: 2 }, f);
            last.call(Obj { a: 1 }, f);
            assert_eq!(calls.get(), 3);
            assert_eq!(last.last_args().map(|o| o.a), Some(1));
        }

        #[test]
        fn failure_keeps_previous_slot() {
            let mut last: LastCall<Obj, i64> = LastCall::new();
            last.call(Obj { a: 1 }, |o| o.a);

            let err = last.try_call(Obj { a: 5 }, |_| Err::<i64, _>("boom"));
            assert_eq!(err, Err("boom"));
            assert_eq!(last.last_result(), Some(&1));
            assert_eq!(last.get(&Obj { a: 1 }), Some(&1));
        }

        #[test]
        fn clear_forces_recompute() {
            let mut last = LastCall::new();
            let calls = Cell::new(0);
            let f = |x: &u32| {
                calls.set(calls.get() + 1);
                *x
            };
            last.call(7u32, f);
            last.clear();
            assert!(!last.is_primed());
            last.call(7u32, f);
            assert_eq!(calls.get(), 2);
        }

        #[test]
        fn tuple_argument_lists() {
            let mut last = LastCall::new();
            let state = Arc::new(vec![1u8, 2]);
            let calls = Cell::new(0);
            let f = |(s, o): &(Arc<Vec<u8>>, Obj)| {
                calls.set(calls.get() + 1);
                s.len() as i64 + o.a
            };
            assert_eq!(last.call((Arc::clone(&state), Obj { a: 1 }), f), 3);
            assert_eq!(last.call((Arc::clone(&state), Obj { a: 1 }), f), 3);
            assert_eq!(last.call((Arc::new(vec![1u8, 2]), Obj { a: 1 }), f), 3);
            assert_eq!(calls.get(), 2);
        }
    }
}
