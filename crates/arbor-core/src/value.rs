//! Change detection for hook state and dependency lists.
//!
//! State setters and memo/effect dependencies compare values with the
//! JavaScript `SameValue` algorithm rather than `PartialEq`: NaN is equal
//! to itself (a stuck NaN must not re-render forever) and `+0.0` differs
//! from `-0.0`. Shared handles compare by pointer identity.

use std::any::Any;
use std::rc::Rc;

/// Equality as used by state updates and dependency comparison.
pub trait SameValue: 'static {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_via_eq {
    ($($ty:ty),* $(,)?) => {
        $(impl SameValue for $ty {
            #[inline]
            fn same_value(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

same_value_via_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
);

impl SameValue for f32 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f64 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized + 'static> SameValue for Rc<T> {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        // Shared handles are compared by identity, like object references.
        Rc::ptr_eq(self, other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.same_value(b))
    }
}

/// A dependency tuple compared element-wise under [`SameValue`].
///
/// The stored fingerprint is type-erased; a stored list of a different
/// arity or element type counts as changed.
pub trait DepList: 'static {
    fn changed_from(&self, prev: &dyn Any) -> bool;
    fn boxed(self) -> Box<dyn Any>;
}

impl DepList for () {
    fn changed_from(&self, prev: &dyn Any) -> bool {
        !prev.is::<()>()
    }

    fn boxed(self) -> Box<dyn Any> {
        Box::new(self)
    }
}

macro_rules! dep_list_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: SameValue),+> DepList for ($($name,)+) {
            fn changed_from(&self, prev: &dyn Any) -> bool {
                match prev.downcast_ref::<Self>() {
                    Some(prev) => !($(self.$idx.same_value(&prev.$idx))&&+),
                    None => true,
                }
            }

            fn boxed(self) -> Box<dyn Any> {
                Box::new(self)
            }
        }
    };
}

dep_list_tuple!(A: 0);
dep_list_tuple!(A: 0, B: 1);
dep_list_tuple!(A: 0, B: 1, C: 2);
dep_list_tuple!(A: 0, B: 1, C: 2, D: 3);
dep_list_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
dep_list_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
dep_list_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
dep_list_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
