// ABOUTME: Member accessors: monomorphized getters/setters plus a by-name reflective fallback.
// ABOUTME: Accessors take type-erased instances so descriptors can be shared across types.

use crate::reflect::{Object, Reflect};
use crate::shape::{MemberLookup, TypeShape};
use std::any::{type_name, Any};
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The result of reading a member.
pub enum Read<'a> {
    /// A reference into the instance (fields, dynamic members).
    Borrowed(&'a dyn Reflect),
    /// A value computed by a property getter.
    Owned(Box<dyn Reflect>),
}

impl Read<'_> {
    /// The value that was read.
    pub fn as_reflect(&self) -> &dyn Reflect {
        match self {
            Read::Borrowed(value) => *value,
            Read::Owned(value) => value.as_ref(),
        }
    }
}

/// Failure while reading or writing a member through an accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessError {
    message: String,
}

impl AccessError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    fn type_mismatch(expected: &'static str) -> Self {
        Self::new(format_args!("instance is not a `{expected}`"))
    }

    fn read_only() -> Self {
        Self::new("member has no setter")
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AccessError {}

/// Why a member could not be compiled to a direct accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// No member with that name is declared on the type.
    UnknownMember { member: String },
    /// The member is resolved by name at run time.
    NotCompilable { member: String },
    /// A setter was requested for a member that has none.
    ReadOnly { member: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownMember { member } => write!(f, "no member named `{member}`"),
            CompileError::NotCompilable { member } => {
                write!(f, "member `{member}` is resolved dynamically")
            }
            CompileError::ReadOnly { member } => write!(f, "member `{member}` is read-only"),
        }
    }
}

impl std::error::Error for CompileError {}

/// A compiled accessor for one member of one type.
pub trait Access: Send + Sync {
    /// Read the member from `instance`.
    fn read<'a>(&self, instance: &'a dyn Any) -> Result<Read<'a>, AccessError>;

    /// Write `value` into the member of `instance`.
    fn write(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<(), AccessError> {
        let _ = (instance, value);
        Err(AccessError::read_only())
    }

    /// True when [`Access::write`] is supported.
    fn is_writable(&self) -> bool {
        false
    }

    /// True for direct accessors, false for the by-name fallback.
    fn is_compiled(&self) -> bool {
        true
    }
}

fn downcast<T: Any>(instance: &dyn Any) -> Result<&T, AccessError> {
    instance
        .downcast_ref::<T>()
        .ok_or_else(|| AccessError::type_mismatch(type_name::<T>()))
}

fn downcast_mut<T: Any>(instance: &mut dyn Any) -> Result<&mut T, AccessError> {
    instance
        .downcast_mut::<T>()
        .ok_or_else(|| AccessError::type_mismatch(type_name::<T>()))
}

fn unbox<F: Any>(value: Box<dyn Any>) -> Result<F, AccessError> {
    value
        .downcast::<F>()
        .map(|boxed| *boxed)
        .map_err(|_| AccessError::type_mismatch(type_name::<F>()))
}

/// Direct access to a stored field.
pub struct FieldAccess<T, F> {
    get: fn(&T) -> &F,
    get_mut: Option<fn(&mut T) -> &mut F>,
}

impl<T: Any, F: Reflect> Access for FieldAccess<T, F> {
    #[inline]
    fn read<'a>(&self, instance: &'a dyn Any) -> Result<Read<'a>, AccessError> {
        let object = downcast::<T>(instance)?;
        Ok(Read::Borrowed((self.get)(object)))
    }

    fn write(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<(), AccessError> {
        let get_mut = self.get_mut.ok_or_else(AccessError::read_only)?;
        let value = unbox::<F>(value)?;
        *get_mut(downcast_mut::<T>(instance)?) = value;
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.get_mut.is_some()
    }
}

type Getter<T, F, E> = Box<dyn Fn(&T) -> Result<F, E> + Send + Sync>;

/// Access through a computed getter, with an optional setter.
pub struct PropertyAccess<T, F, E> {
    get: Getter<T, F, E>,
    set: Option<fn(&mut T, F)>,
    _error: PhantomData<fn() -> E>,
}

impl<T: Any, F: Reflect, E: fmt::Display + 'static> Access for PropertyAccess<T, F, E> {
    fn read<'a>(&self, instance: &'a dyn Any) -> Result<Read<'a>, AccessError> {
        let object = downcast::<T>(instance)?;
        let value = (self.get)(object).map_err(AccessError::new)?;
        Ok(Read::Owned(Box::new(value)))
    }

    fn write(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<(), AccessError> {
        let set = self.set.ok_or_else(AccessError::read_only)?;
        let value = unbox::<F>(value)?;
        set(downcast_mut::<T>(instance)?, value);
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

/// By-name access through [`Object::member`], used for members that cannot
/// be compiled.
pub struct ReflectiveAccess {
    name: &'static str,
    lookup: MemberLookup,
}

impl Access for ReflectiveAccess {
    fn read<'a>(&self, instance: &'a dyn Any) -> Result<Read<'a>, AccessError> {
        Ok(Read::Borrowed((self.lookup)(instance, self.name).unwrap_or(&())))
    }

    fn is_compiled(&self) -> bool {
        false
    }
}

/// Builds and resolves member accessors.
pub struct AccessorCompiler;

impl AccessorCompiler {
    /// A field accessor, writable when `get_mut` is given.
    pub fn field<T: Object, F: Reflect>(
        get: fn(&T) -> &F,
        get_mut: Option<fn(&mut T) -> &mut F>,
    ) -> Arc<dyn Access> {
        Arc::new(FieldAccess { get, get_mut })
    }

    /// An infallible property accessor, writable when `set` is given.
    pub fn property<T: Object, F: Reflect>(
        get: fn(&T) -> F,
        set: Option<fn(&mut T, F)>,
    ) -> Arc<dyn Access> {
        Arc::new(PropertyAccess::<T, F, Infallible> {
            get: Box::new(move |object: &T| Ok::<F, Infallible>(get(object))),
            set,
            _error: PhantomData,
        })
    }

    /// A read-only property whose getter can fail.
    pub fn try_property<T: Object, F: Reflect, E: fmt::Display + 'static>(
        get: fn(&T) -> Result<F, E>,
    ) -> Arc<dyn Access> {
        Arc::new(PropertyAccess {
            get: Box::new(get),
            set: None,
            _error: PhantomData,
        })
    }

    /// The by-name fallback for a dynamic member.
    pub fn reflective(name: &'static str, lookup: MemberLookup) -> Arc<dyn Access> {
        Arc::new(ReflectiveAccess { name, lookup })
    }

    /// Resolve the read accessor of `member`.
    pub fn compile_getter(shape: &TypeShape, member: &str) -> Result<Arc<dyn Access>, CompileError> {
        let declared = shape
            .member(member)
            .ok_or_else(|| CompileError::UnknownMember {
                member: member.to_owned(),
            })?;
        declared
            .accessor()
            .cloned()
            .ok_or_else(|| CompileError::NotCompilable {
                member: member.to_owned(),
            })
    }

    /// Resolve the write accessor of `member`.
    pub fn compile_setter(shape: &TypeShape, member: &str) -> Result<Arc<dyn Access>, CompileError> {
        let access = Self::compile_getter(shape, member)?;
        if access.is_writable() {
            Ok(access)
        } else {
            Err(CompileError::ReadOnly {
                member: member.to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Kind;
    use crate::shape::Shape;
    use crate::reflect_object;

    struct Account {
        owner: String,
        balance: i64,
        extra: Vec<(String, i32)>,
    }

    impl Account {
        fn overdrawn(&self) -> bool {
            self.balance < 0
        }

        fn ratio(&self) -> Result<f64, String> {
            if self.balance == 0 {
                Err("zero balance".into())
            } else {
                Ok(1.0 / self.balance as f64)
            }
        }
    }

    impl Object for Account {
        fn describe(shape: &mut Shape<Self>) {
            shape.field("Owner", |a| &a.owner);
            shape.field_rw("Balance", |a| &a.balance, |a| &mut a.balance);
            shape.property("Overdrawn", Account::overdrawn);
            shape.property_rw("Label", |a| a.owner.to_uppercase(), |a, v| a.owner = v);
            shape.try_property("Ratio", Account::ratio);
            shape.dynamic("Tag");
        }

        fn member(&self, name: &str) -> Option<&dyn Reflect> {
            self.extra
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value as &dyn Reflect)
        }
    }

    reflect_object!(Account);

    fn account() -> Account {
        Account {
            owner: "ann".into(),
            balance: 10,
            extra: vec![("Tag".into(), 3)],
        }
    }

    #[test]
    fn test_compile_getter_reads_field() {
        let shape = TypeShape::of::<Account>();
        let access = AccessorCompiler::compile_getter(&shape, "Owner").unwrap();
        let account = account();
        let read = access.read(&account).unwrap();
        assert!(matches!(read.as_reflect().kind(), Kind::Str("ann")));
        assert!(access.is_compiled());
        assert!(!access.is_writable());
    }

    #[test]
    fn test_property_returns_owned_value() {
        let shape = TypeShape::of::<Account>();
        let access = AccessorCompiler::compile_getter(&shape, "Overdrawn").unwrap();
        let account = account();
        let read = access.read(&account).unwrap();
        assert!(matches!(read, Read::Owned(_)));
        assert!(matches!(read.as_reflect().kind(), Kind::Bool(false)));
    }

    #[test]
    fn test_fallible_property_reports_error() {
        let shape = TypeShape::of::<Account>();
        let access = AccessorCompiler::compile_getter(&shape, "Ratio").unwrap();
        let mut account = account();
        account.balance = 0;
        let err = access.read(&account).err().unwrap();
        assert_eq!(err.to_string(), "zero balance");
    }

    #[test]
    fn test_setters() {
        let shape = TypeShape::of::<Account>();
        let mut account = account();

        let balance = AccessorCompiler::compile_setter(&shape, "Balance").unwrap();
        balance.write(&mut account, Box::new(-5i64)).unwrap();
        assert_eq!(account.balance, -5);
        assert!(account.overdrawn());

        let label = AccessorCompiler::compile_setter(&shape, "Label").unwrap();
        label.write(&mut account, Box::new(String::from("bob"))).unwrap();
        assert_eq!(account.owner, "bob");

        let err = balance.write(&mut account, Box::new("wrong")).err().unwrap();
        assert!(err.to_string().contains("i64"));

        assert_eq!(
            AccessorCompiler::compile_setter(&shape, "Overdrawn").err(),
            Some(CompileError::ReadOnly {
                member: "Overdrawn".into()
            })
        );
    }

    #[test]
    fn test_dynamic_member_is_not_compilable() {
        let shape = TypeShape::of::<Account>();
        assert_eq!(
            AccessorCompiler::compile_getter(&shape, "Tag").err(),
            Some(CompileError::NotCompilable {
                member: "Tag".into()
            })
        );
        assert_eq!(
            AccessorCompiler::compile_getter(&shape, "Missing").err(),
            Some(CompileError::UnknownMember {
                member: "Missing".into()
            })
        );

        let fallback = AccessorCompiler::reflective("Tag", shape.lookup());
        let account = account();
        let read = fallback.read(&account).unwrap();
        assert!(matches!(read.as_reflect().kind(), Kind::Int(3)));
        assert!(!fallback.is_compiled());

        let missing = AccessorCompiler::reflective("Nope", shape.lookup());
        let read = missing.read(&account).unwrap();
        assert!(matches!(read.as_reflect().kind(), Kind::Null));
    }

    #[test]
    fn test_type_mismatch() {
        let shape = TypeShape::of::<Account>();
        let access = AccessorCompiler::compile_getter(&shape, "Owner").unwrap();
        let err = access.read(&42u8).err().unwrap();
        assert!(err.to_string().contains("Account"));
    }
}
