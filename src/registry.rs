// ABOUTME: Process-wide registry of custom types that serialize to and parse from strings.
// ABOUTME: Registering a type clears the descriptor cache so member categories are recomputed.

use crate::descriptor::TypeDescriptorCache;
use crate::error::{Error, Result};
use crate::sync;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

type SerializeFn = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type DeserializeFn = Box<dyn Fn(&str) -> Option<Box<dyn Any>> + Send + Sync>;

/// A registered custom type: a pair of string conversions.
pub struct CustomType {
    type_name: &'static str,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl CustomType {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Convert a value to its string form. `None` when `value` is not an
    /// instance of the registered type.
    pub fn serialize(&self, value: &dyn Any) -> Option<String> {
        (self.serialize)(value)
    }

    /// Parse the string form back into a boxed instance.
    pub fn deserialize(&self, text: &str) -> Option<Box<dyn Any>> {
        (self.deserialize)(text)
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomType")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<CustomType>>>;

fn registry() -> &'static Registry {
    static CUSTOM_TYPES: OnceLock<Registry> = OnceLock::new();
    CUSTOM_TYPES.get_or_init(Registry::default)
}

/// Set once anything is registered so the common case skips the lock.
static HAS_CUSTOM_TYPES: AtomicBool = AtomicBool::new(false);

/// Custom types written as JSON strings produced by a host-supplied function.
pub struct CustomTypeRegistry;

impl CustomTypeRegistry {
    /// Register `T` with its serializer and deserializer.
    ///
    /// Both functions are required; a missing one is a configuration error.
    /// Registering again replaces the previous pair.
    pub fn register<T: Any>(
        serializer: Option<fn(&T) -> String>,
        deserializer: Option<fn(&str) -> Option<T>>,
    ) -> Result<()> {
        let type_name = type_name::<T>();
        let (Some(serializer), Some(deserializer)) = (serializer, deserializer) else {
            let missing = if serializer.is_none() {
                "serializer"
            } else {
                "deserializer"
            };
            return Err(Error::CustomTypeRejected {
                type_name: type_name.to_owned(),
                message: format!("missing {missing}"),
            });
        };

        let custom = CustomType {
            type_name,
            serialize: Box::new(move |value: &dyn Any| value.downcast_ref::<T>().map(serializer)),
            deserialize: Box::new(move |text: &str| {
                deserializer(text).map(|value| Box::new(value) as Box<dyn Any>)
            }),
        };

        sync::write(registry()).insert(TypeId::of::<T>(), Arc::new(custom));
        HAS_CUSTOM_TYPES.store(true, Ordering::Release);
        log::debug!("registered custom type `{type_name}`");

        TypeDescriptorCache::reset();
        Ok(())
    }

    /// The registration for `type_id`, if any.
    pub fn lookup(type_id: TypeId) -> Option<Arc<CustomType>> {
        if !HAS_CUSTOM_TYPES.load(Ordering::Acquire) {
            return None;
        }
        sync::read(registry()).get(&type_id).cloned()
    }

    pub fn contains(type_id: TypeId) -> bool {
        Self::lookup(type_id).is_some()
    }

    /// Parse `text` with the deserializer registered for `T`.
    pub fn deserialize<T: Any>(text: &str) -> Option<T> {
        let custom = Self::lookup(TypeId::of::<T>())?;
        let boxed = custom.deserialize(text)?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    /// Remove the registration for `T`. Returns whether one existed.
    pub fn unregister<T: Any>() -> bool {
        let removed = sync::write(registry())
            .remove(&TypeId::of::<T>())
            .is_some();
        if removed {
            log::debug!("unregistered custom type `{}`", type_name::<T>());
            TypeDescriptorCache::reset();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Celsius(i32);

    fn celsius_to_string(value: &Celsius) -> String {
        format!("{}C", value.0)
    }

    fn celsius_from_str(text: &str) -> Option<Celsius> {
        text.strip_suffix('C')?.parse().ok().map(Celsius)
    }

    #[test]
    fn test_register_and_convert() {
        let _guard = sync::serial_guard();
        CustomTypeRegistry::register(
            Some(celsius_to_string as fn(&Celsius) -> String),
            Some(celsius_from_str as fn(&str) -> Option<Celsius>),
        )
        .unwrap();

        let custom = CustomTypeRegistry::lookup(TypeId::of::<Celsius>()).unwrap();
        assert_eq!(custom.serialize(&Celsius(21)), Some("21C".to_string()));
        assert_eq!(custom.serialize(&21i32), None);
        assert!(custom.type_name().ends_with("Celsius"));

        assert_eq!(
            CustomTypeRegistry::deserialize::<Celsius>("-4C"),
            Some(Celsius(-4))
        );
        assert_eq!(CustomTypeRegistry::deserialize::<Celsius>("oops"), None);

        assert!(CustomTypeRegistry::unregister::<Celsius>());
        assert!(!CustomTypeRegistry::contains(TypeId::of::<Celsius>()));
    }

    #[test]
    fn test_missing_functions_rejected() {
        struct Opaque;

        let err = CustomTypeRegistry::register::<Opaque>(None, Some(|_| Some(Opaque))).unwrap_err();
        assert_eq!(err.error_type(), "custom_type_rejected");
        assert!(err.to_string().contains("missing serializer"));

        let err =
            CustomTypeRegistry::register::<Opaque>(Some(|_| String::new()), None).unwrap_err();
        assert!(err.to_string().contains("missing deserializer"));
        assert!(err.is_configuration());
        assert!(!CustomTypeRegistry::contains(TypeId::of::<Opaque>()));
    }
}
