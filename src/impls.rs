// ABOUTME: Reflect implementations for std, chrono, uuid and indexmap types.
// ABOUTME: Each impl reports the most specific runtime kind and the declared category of its type.

use crate::reflect::{AsAny, Kind, Reflect, Timestamp};
use crate::types::Category;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::any::TypeId;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

impl Reflect for () {
    fn kind(&self) -> Kind<'_> {
        Kind::Null
    }
}

impl Reflect for bool {
    fn kind(&self) -> Kind<'_> {
        Kind::Bool(*self)
    }

    fn category() -> Category {
        Category::Boolean
    }
}

macro_rules! reflect_int {
    ($variant:ident, $category:ident, $($ty:ty),+) => {
        $(
            impl Reflect for $ty {
                #[inline]
                fn kind(&self) -> Kind<'_> {
                    Kind::$variant((*self).into())
                }

                fn category() -> Category {
                    Category::$category
                }
            }
        )+
    };
}

reflect_int!(Int, Integer, i8, i16, i32);
reflect_int!(Int, LongInteger, i64);
reflect_int!(UInt, Integer, u8, u16, u32);
reflect_int!(UInt, LongInteger, u64);

impl Reflect for isize {
    fn kind(&self) -> Kind<'_> {
        Kind::Int(*self as i64)
    }

    fn category() -> Category {
        Category::LongInteger
    }
}

impl Reflect for usize {
    fn kind(&self) -> Kind<'_> {
        Kind::UInt(*self as u64)
    }

    fn category() -> Category {
        Category::LongInteger
    }
}

impl Reflect for f32 {
    fn kind(&self) -> Kind<'_> {
        Kind::F32(*self)
    }

    fn category() -> Category {
        Category::Float
    }
}

impl Reflect for f64 {
    fn kind(&self) -> Kind<'_> {
        Kind::F64(*self)
    }

    fn category() -> Category {
        Category::Float
    }
}

impl Reflect for char {
    fn kind(&self) -> Kind<'_> {
        Kind::Char(*self)
    }

    fn category() -> Category {
        Category::Text
    }
}

impl Reflect for String {
    fn kind(&self) -> Kind<'_> {
        Kind::Str(self)
    }

    fn category() -> Category {
        Category::Text
    }
}

impl Reflect for &'static str {
    fn kind(&self) -> Kind<'_> {
        Kind::Str(self)
    }

    fn category() -> Category {
        Category::Text
    }
}

impl Reflect for Cow<'static, str> {
    fn kind(&self) -> Kind<'_> {
        Kind::Str(self)
    }

    fn category() -> Category {
        Category::Text
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn kind(&self) -> Kind<'_> {
        match self {
            Some(value) => Kind::Indirect(value),
            None => Kind::Null,
        }
    }

    fn category() -> Category {
        T::category()
    }
}

impl<T: Reflect> Reflect for OnceCell<T> {
    fn kind(&self) -> Kind<'_> {
        match self.get() {
            Some(value) => Kind::Indirect(value),
            None => Kind::Null,
        }
    }

    fn category() -> Category {
        T::category()
    }
}

impl<T: Reflect> Reflect for OnceLock<T> {
    fn kind(&self) -> Kind<'_> {
        match self.get() {
            Some(value) => Kind::Indirect(value),
            None => Kind::Null,
        }
    }

    fn category() -> Category {
        T::category()
    }
}

macro_rules! reflect_pointer {
    ($($ptr:ident),+) => {
        $(
            impl<T: Reflect> Reflect for $ptr<T> {
                #[inline]
                fn kind(&self) -> Kind<'_> {
                    Kind::Indirect(&**self)
                }

                fn category() -> Category {
                    T::category()
                }
            }

            impl Reflect for $ptr<dyn Reflect> {
                #[inline]
                fn kind(&self) -> Kind<'_> {
                    Kind::Indirect(&**self)
                }

                fn reflect_type_name(&self) -> &'static str {
                    (**self).reflect_type_name()
                }
            }
        )+
    };
}

reflect_pointer!(Box, Rc, Arc);

impl<T: Reflect> Reflect for &'static T {
    fn kind(&self) -> Kind<'_> {
        Kind::Indirect(*self)
    }

    fn category() -> Category {
        T::category()
    }
}

#[inline]
fn byte_category<T: 'static>() -> Category {
    if TypeId::of::<T>() == TypeId::of::<u8>() {
        Category::ByteArray
    } else {
        Category::Array
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn kind(&self) -> Kind<'_> {
        if let Some(bytes) = self.as_any().downcast_ref::<Vec<u8>>() {
            return Kind::Bytes(bytes);
        }
        Kind::Seq(Box::new(self.iter().map(|item| item as &dyn Reflect)))
    }

    fn category() -> Category {
        byte_category::<T>()
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn kind(&self) -> Kind<'_> {
        if let Some(bytes) = self.as_any().downcast_ref::<[u8; N]>() {
            return Kind::Bytes(bytes);
        }
        Kind::Seq(Box::new(self.iter().map(|item| item as &dyn Reflect)))
    }

    fn category() -> Category {
        byte_category::<T>()
    }
}

macro_rules! reflect_seq {
    ($($seq:ident),+) => {
        $(
            impl<T: Reflect, S: 'static> Reflect for $seq<T, S> {
                fn kind(&self) -> Kind<'_> {
                    Kind::Seq(Box::new(self.iter().map(|item| item as &dyn Reflect)))
                }

                fn category() -> Category {
                    Category::Array
                }
            }
        )+
    };
}

reflect_seq!(HashSet, IndexSet);

impl<T: Reflect> Reflect for VecDeque<T> {
    fn kind(&self) -> Kind<'_> {
        Kind::Seq(Box::new(self.iter().map(|item| item as &dyn Reflect)))
    }

    fn category() -> Category {
        Category::Array
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn kind(&self) -> Kind<'_> {
        Kind::Seq(Box::new(self.iter().map(|item| item as &dyn Reflect)))
    }

    fn category() -> Category {
        Category::Array
    }
}

/// Dictionaries keyed by text serialize as JSON objects; all others as entry lists.
#[inline]
fn has_text_keys<K: Reflect>() -> bool {
    K::category() == Category::Text
}

macro_rules! reflect_map {
    ($map:ident $(, $hasher:ident)?) => {
        impl<K: Reflect, V: Reflect $(, $hasher: 'static)?> Reflect for $map<K, V $(, $hasher)?> {
            fn kind(&self) -> Kind<'_> {
                let entries = Box::new(
                    self.iter()
                        .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect)),
                );
                if has_text_keys::<K>() {
                    Kind::StrMap(entries)
                } else {
                    Kind::Map(entries)
                }
            }

            fn category() -> Category {
                if has_text_keys::<K>() {
                    Category::StringDictionary
                } else {
                    Category::Dictionary
                }
            }
        }
    };
}

reflect_map!(HashMap, S);
reflect_map!(IndexMap, S);
reflect_map!(BTreeMap);

macro_rules! reflect_zoned {
    ($($tz:ty),+) => {
        $(
            impl Reflect for DateTime<$tz> {
                fn kind(&self) -> Kind<'_> {
                    Kind::Timestamp(Timestamp::Zoned(self.fixed_offset()))
                }

                fn category() -> Category {
                    Category::Temporal
                }
            }
        )+
    };
}

reflect_zoned!(Utc, FixedOffset, Local);

impl Reflect for NaiveDateTime {
    fn kind(&self) -> Kind<'_> {
        Kind::Timestamp(Timestamp::Naive(*self))
    }

    fn category() -> Category {
        Category::Temporal
    }
}

impl Reflect for NaiveDate {
    fn kind(&self) -> Kind<'_> {
        Kind::Timestamp(Timestamp::Naive(self.and_time(NaiveTime::MIN)))
    }

    fn category() -> Category {
        Category::Temporal
    }
}

impl Reflect for Uuid {
    fn kind(&self) -> Kind<'_> {
        Kind::Guid(*self)
    }

    fn category() -> Category {
        Category::Guid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_len(value: &dyn Reflect) -> usize {
        match value.kind() {
            Kind::Seq(items) => items.count(),
            other => panic!("expected a sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_kinds() {
        assert!(matches!(7i8.kind(), Kind::Int(7)));
        assert!(matches!(7u32.kind(), Kind::UInt(7)));
        assert!(matches!((-3isize).kind(), Kind::Int(-3)));
        assert_eq!(i32::category(), Category::Integer);
        assert_eq!(u64::category(), Category::LongInteger);
        assert_eq!(usize::category(), Category::LongInteger);
    }

    #[test]
    fn test_option_and_pointers_forward() {
        let some: Option<i32> = Some(4);
        let Kind::Indirect(inner) = some.kind() else {
            panic!("expected indirect");
        };
        assert!(matches!(inner.kind(), Kind::Int(4)));
        assert!(matches!(None::<i32>.kind(), Kind::Null));
        assert_eq!(Option::<String>::category(), Category::Text);

        let boxed: Box<dyn Reflect> = Box::new(2.5f64);
        assert!(matches!(boxed.kind(), Kind::Indirect(_)));
        assert_eq!(boxed.reflect_type_name(), "f64");
        assert_eq!(Box::<dyn Reflect>::category(), Category::Unknown);
        assert_eq!(Arc::<String>::category(), Category::Text);
    }

    #[test]
    fn test_bytes_are_not_sequences() {
        let bytes = vec![1u8, 2, 3];
        assert!(matches!(bytes.kind(), Kind::Bytes([1, 2, 3])));
        assert_eq!(Vec::<u8>::category(), Category::ByteArray);

        let array = [9u8; 4];
        assert!(matches!(array.kind(), Kind::Bytes(b) if b.len() == 4));

        let numbers = vec![1u16, 2, 3];
        assert_eq!(seq_len(&numbers), 3);
        assert_eq!(Vec::<u16>::category(), Category::Array);
    }

    #[test]
    fn test_map_kinds() {
        let mut by_name = BTreeMap::new();
        by_name.insert(String::from("a"), 1);
        assert!(matches!(by_name.kind(), Kind::StrMap(_)));
        assert_eq!(
            BTreeMap::<String, i32>::category(),
            Category::StringDictionary
        );

        let mut by_id: HashMap<i32, String> = HashMap::new();
        by_id.insert(1, "one".into());
        assert!(matches!(by_id.kind(), Kind::Map(_)));
        assert_eq!(HashMap::<i32, String>::category(), Category::Dictionary);
    }

    #[test]
    fn test_temporal_kinds() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap();
        let Kind::Timestamp(Timestamp::Naive(naive)) = date.kind() else {
            panic!("expected naive timestamp");
        };
        assert_eq!(naive.to_string(), "2020-05-17 00:00:00");

        let utc = Utc::now();
        assert!(matches!(utc.kind(), Kind::Timestamp(Timestamp::Zoned(_))));
        assert_eq!(DateTime::<Utc>::category(), Category::Temporal);
    }
}
