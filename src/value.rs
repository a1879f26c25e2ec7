// ABOUTME: Dynamic property bags for ad-hoc shapes that have no Rust type of their own.
// ABOUTME: Maps keep insertion order and are written as string-keyed dictionaries.

use crate::options::SerializationOptions;
use crate::reflect::{Kind, Reflect};
use indexmap::IndexMap;
use std::fmt;

/// A number held by a [`Value`], kept in the width it was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// An untyped value: a scalar, a list, or an ordered map of named values.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// An empty map, ready for [`Value::insert`].
    #[must_use]
    pub fn map() -> Self {
        Value::Map(IndexMap::new())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Set `key` on a map, returning the previous value. A non-map value is
    /// replaced by a map holding only `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        if !matches!(self, Value::Map(_)) {
            *self = Value::map();
        }
        match self {
            Value::Map(entries) => entries.insert(key.into(), value.into()),
            _ => None,
        }
    }

    /// The entry `key` of a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// The element at `index` of a list.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Value> {
        match self {
            Value::List(items) => items.get(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Integer content that fits in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(n)) => Some(*n),
            Value::Number(Number::UInt(n)) => i64::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl Reflect for Value {
    fn kind(&self) -> Kind<'_> {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(b) => Kind::Bool(*b),
            Value::Number(Number::Int(n)) => Kind::Int(*n),
            Value::Number(Number::UInt(n)) => Kind::UInt(*n),
            Value::Number(Number::Float(n)) => Kind::F64(*n),
            Value::Text(text) => Kind::Str(text),
            Value::List(items) => Kind::Seq(Box::new(items.iter().map(|v| v as &dyn Reflect))),
            Value::Map(entries) => Kind::StrMap(Box::new(
                entries
                    .iter()
                    .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect)),
            )),
        }
    }
}

/// Compact JSON with [`SerializationOptions::strict`], non-ASCII left unescaped.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = SerializationOptions {
            escape_non_ascii: false,
            ..SerializationOptions::strict()
        };
        let json = crate::to_string_with_options(self, &options).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $make:expr),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $make
                }
            }
        )+
    };
}

value_from! {
    bool => |b| Value::Bool(b),
    i8 => |n| Value::Number(Number::Int(n.into())),
    i16 => |n| Value::Number(Number::Int(n.into())),
    i32 => |n| Value::Number(Number::Int(n.into())),
    i64 => |n| Value::Number(Number::Int(n)),
    u8 => |n| Value::Number(Number::Int(n.into())),
    u16 => |n| Value::Number(Number::Int(n.into())),
    u32 => |n| Value::Number(Number::Int(n.into())),
    u64 => |n| Value::Number(i64::try_from(n).map_or(Number::UInt(n), Number::Int)),
    f32 => |n| Value::Number(Number::Float(n.into())),
    f64 => |n| Value::Number(Number::Float(n)),
    String => |s| Value::Text(s),
    &str => |s| Value::Text(s.to_owned()),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::List(iter.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Value`] from JSON-like literal syntax.
///
/// Elements and entry values may be any expression, including negative
/// literals; nested lists, maps and `null` use the same syntax.
///
/// ```rust
/// use reflect_json::value;
///
/// let bag = value!({"name": "test", "sizes": [1, -2], "open": true, "owner": null});
/// assert_eq!(bag.to_string(), r#"{"name":"test","sizes":[1,-2],"open":true,"owner":null}"#);
/// ```
#[macro_export]
macro_rules! value {
    // list elements, collected up to each comma
    (@list [$($done:expr,)*] ($($cur:tt)*) , $($rest:tt)*) => {
        $crate::value!(@list [$($done,)* $crate::value!($($cur)*),] () $($rest)*)
    };
    (@list [$($done:expr,)*] ($($cur:tt)*) $next:tt $($rest:tt)*) => {
        $crate::value!(@list [$($done,)*] ($($cur)* $next) $($rest)*)
    };
    (@list [$($done:expr,)*] ()) => {
        vec![$($done,)*]
    };
    (@list [$($done:expr,)*] ($($cur:tt)+)) => {
        vec![$($done,)* $crate::value!($($cur)+)]
    };

    // map entries
    (@map $bag:ident) => {};
    (@map $bag:ident $key:tt : $($rest:tt)*) => {
        $crate::value!(@entry $bag $key () $($rest)*);
    };
    (@entry $bag:ident $key:tt ($($cur:tt)*) , $($rest:tt)*) => {
        $bag.insert($key, $crate::value!($($cur)*));
        $crate::value!(@map $bag $($rest)*);
    };
    (@entry $bag:ident $key:tt ($($cur:tt)*) $next:tt $($rest:tt)*) => {
        $crate::value!(@entry $bag $key ($($cur)* $next) $($rest)*);
    };
    (@entry $bag:ident $key:tt ($($cur:tt)+)) => {
        $bag.insert($key, $crate::value!($($cur)+));
    };

    (null) => {
        $crate::Value::Null
    };
    ([ $($items:tt)* ]) => {
        $crate::Value::List($crate::value!(@list [] () $($items)*))
    };
    ({ $($body:tt)* }) => {{
        let mut bag = $crate::Value::map();
        $crate::value!(@map bag $($body)*);
        bag
    }};
    ($scalar:expr) => {
        $crate::Value::from($scalar)
    };
}
