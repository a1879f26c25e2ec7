// ABOUTME: The reflection model: runtime kinds, object handles and the Reflect trait.
// ABOUTME: Values report their category at run time, so the writer never needs their static type.

use crate::shape::{Shape, TypeShape};
use crate::types::Category;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use std::any::{Any, TypeId};
use std::fmt;
use uuid::Uuid;

/// Upcast helper so `&dyn Reflect` can be downcast to its concrete type.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value the serializer can inspect at run time.
///
/// Implementations exist for the std scalars, strings, options, smart pointers,
/// collections, chrono date-times and `uuid::Uuid`. Plain structs implement
/// [`Object`] and get their `Reflect` impl from [`reflect_object!`](crate::reflect_object);
/// fieldless enums use [`reflect_enum!`](crate::reflect_enum).
pub trait Reflect: AsAny {
    /// The runtime category of this value.
    fn kind(&self) -> Kind<'_>;

    /// The runtime type name, used in `___map` hints.
    fn reflect_type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The category of the declared type, used as a fast-path hint.
    fn category() -> Category
    where
        Self: Sized,
    {
        Category::Unknown
    }
}

/// Elements of a sequence.
pub type Elements<'a> = Box<dyn Iterator<Item = &'a dyn Reflect> + 'a>;

/// Key/value pairs of a dictionary.
pub type Entries<'a> = Box<dyn Iterator<Item = (&'a dyn Reflect, &'a dyn Reflect)> + 'a>;

/// The closed set of runtime categories a value can report.
///
/// Implementations pick the most specific variant: `Vec<u8>` reports `Bytes`
/// rather than `Seq`, and maps with text keys report `StrMap` rather than `Map`.
pub enum Kind<'a> {
    /// Absent value, written as `null`.
    Null,
    /// Forwards to another value: `Some(_)`, boxes and shared pointers.
    Indirect(&'a dyn Reflect),
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(&'a str),
    Timestamp(Timestamp),
    Guid(Uuid),
    Bytes(&'a [u8]),
    Seq(Elements<'a>),
    /// Dictionary whose keys report `Str` or `Char`.
    StrMap(Entries<'a>),
    /// Dictionary with any other key type.
    Map(Entries<'a>),
    Enum(EnumValue),
    Object(ObjectRef<'a>),
}

impl fmt::Debug for Kind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Null => write!(f, "Null"),
            Kind::Indirect(inner) => write!(f, "Indirect({})", inner.reflect_type_name()),
            Kind::Bool(b) => write!(f, "Bool({b})"),
            Kind::Int(n) => write!(f, "Int({n})"),
            Kind::UInt(n) => write!(f, "UInt({n})"),
            Kind::F32(n) => write!(f, "F32({n})"),
            Kind::F64(n) => write!(f, "F64({n})"),
            Kind::Char(c) => write!(f, "Char({c:?})"),
            Kind::Str(s) => write!(f, "Str({s:?})"),
            Kind::Timestamp(ts) => write!(f, "Timestamp({ts:?})"),
            Kind::Guid(g) => write!(f, "Guid({g})"),
            Kind::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
            Kind::Seq(_) => write!(f, "Seq"),
            Kind::StrMap(_) => write!(f, "StrMap"),
            Kind::Map(_) => write!(f, "Map"),
            Kind::Enum(e) => write!(f, "Enum({}={})", e.name, e.value),
            Kind::Object(o) => write!(f, "Object({:?})", o.identity),
        }
    }
}

/// A point in time, with or without a known UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    /// No offset; treated as local time when converting to UTC.
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Convert to UTC.
    #[must_use]
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            Timestamp::Zoned(dt) => dt.with_timezone(&Utc),
            Timestamp::Naive(naive) => match Local.from_local_datetime(&naive).earliest() {
                Some(local) => local.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            },
        }
    }
}

/// A fieldless enum value: its variant name and discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    name: &'static str,
    value: i64,
}

impl EnumValue {
    #[must_use]
    pub const fn new(name: &'static str, value: i64) -> Self {
        Self { name, value }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }
}

/// Identity of an object instance: its address and concrete type.
///
/// The type is part of the key because a struct and its first field share an
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    address: usize,
    type_id: TypeId,
}

impl Identity {
    #[must_use]
    pub fn of<T: Any>(value: &T) -> Self {
        Self {
            address: value as *const T as usize,
            type_id: TypeId::of::<T>(),
        }
    }
}

/// A type-erased handle to a plain object.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    instance: &'a dyn Any,
    identity: Option<Identity>,
    shape: fn() -> TypeShape,
}

impl<'a> ObjectRef<'a> {
    /// Wrap an object. Zero-sized objects carry no identity.
    pub fn new<T: Object>(object: &'a T) -> Self {
        let identity = (std::mem::size_of::<T>() != 0).then(|| Identity::of(object));
        Self {
            instance: object,
            identity,
            shape: TypeShape::of::<T>,
        }
    }

    #[must_use]
    pub fn instance(&self) -> &'a dyn Any {
        self.instance
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.instance.type_id()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Discovery function for the object's type.
    #[must_use]
    pub fn shape_fn(&self) -> fn() -> TypeShape {
        self.shape
    }
}

/// A plain object type: a set of named members.
///
/// `describe` is the discovery step; it runs once per type and the result is
/// cached by [`TypeDescriptorCache`](crate::TypeDescriptorCache).
///
/// ```rust
/// use reflect_json::{reflect_object, Object, Shape};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Object for Point {
///     fn describe(shape: &mut Shape<Self>) {
///         shape.field("X", |p| &p.x);
///         shape.field("Y", |p| &p.y);
///     }
/// }
///
/// reflect_object!(Point);
/// ```
pub trait Object: Reflect + Sized {
    /// Declare the members of this type.
    fn describe(shape: &mut Shape<Self>);

    /// Resolve a member declared with [`Shape::dynamic`] by name.
    /// Returning `None` writes the member as `null`.
    fn member(&self, name: &str) -> Option<&dyn Reflect> {
        let _ = name;
        None
    }
}

/// Implement [`Reflect`] for types that implement [`Object`].
#[macro_export]
macro_rules! reflect_object {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn kind(&self) -> $crate::Kind<'_> {
                    $crate::Kind::Object($crate::ObjectRef::new(self))
                }

                fn category() -> $crate::Category {
                    $crate::Category::Object
                }
            }
        )+
    };
}

/// Implement [`Reflect`] for a fieldless `Copy` enum.
///
/// ```rust
/// use reflect_json::reflect_enum;
///
/// #[derive(Clone, Copy)]
/// enum Color {
///     Red,
///     Green = 5,
/// }
///
/// reflect_enum!(Color { Red, Green });
/// ```
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn kind(&self) -> $crate::Kind<'_> {
                let name = match self {
                    $( $ty::$variant => stringify!($variant), )+
                };
                $crate::Kind::Enum($crate::EnumValue::new(name, *self as i64))
            }

            fn category() -> $crate::Category {
                $crate::Category::Enum
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Clone, Copy)]
    enum Level {
        Low,
        High = 10,
    }

    reflect_enum!(Level { Low, High });

    struct Outer {
        inner: Inner,
    }

    struct Inner {
        value: i32,
    }

    impl Object for Outer {
        fn describe(shape: &mut Shape<Self>) {
            shape.field("Inner", |o| &o.inner);
        }
    }

    impl Object for Inner {
        fn describe(shape: &mut Shape<Self>) {
            shape.field("Value", |i| &i.value);
        }
    }

    reflect_object!(Outer, Inner);

    #[test]
    fn test_enum_kind() {
        match Level::High.kind() {
            Kind::Enum(e) => {
                assert_eq!(e.name(), "High");
                assert_eq!(e.value(), 10);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(matches!(Level::Low.kind(), Kind::Enum(e) if e.value() == 0));
        assert_eq!(Level::category(), Category::Enum);
    }

    #[test]
    fn test_identity_distinguishes_first_field() {
        let outer = Outer {
            inner: Inner { value: 1 },
        };
        let a = ObjectRef::new(&outer).identity().unwrap();
        let b = ObjectRef::new(&outer.inner).identity().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, ObjectRef::new(&outer).identity().unwrap());
        assert_eq!(outer.inner.value, 1);
    }

    #[test]
    fn test_as_any_reaches_concrete_type() {
        let value: &dyn Reflect = &Inner { value: 7 };
        let inner = value.as_any().downcast_ref::<Inner>().unwrap();
        assert_eq!(inner.value, 7);
    }

    #[test]
    fn test_timestamp_to_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let zoned = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap();
        let utc = Timestamp::Zoned(zoned).to_utc();
        assert_eq!(utc.format("%H:%M").to_string(), "10:00");
    }
}
