// ABOUTME: Reflection-driven JSON serializer for arbitrary object graphs.
// ABOUTME: Provides cached member accessors, cycle handling, a global type table and a pretty-printer.

//! # reflect_json
//!
//! Serializes object graphs to JSON by inspecting values at run time instead
//! of generating code per type. Member lists and accessors are discovered once
//! per type and cached for the life of the process.
//!
//! ## Quick Start
//!
//! ```rust
//! use reflect_json::{reflect_object, to_string_with_options, Object, SerializationOptions, Shape};
//!
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl Object for Person {
//!     fn describe(shape: &mut Shape<Self>) {
//!         shape.name("Person");
//!         shape.field("Name", |p| &p.name);
//!         shape.field("Age", |p| &p.age);
//!     }
//! }
//!
//! reflect_object!(Person);
//!
//! let person = Person { name: "Alice".to_string(), age: 30 };
//!
//! let json = to_string_with_options(&person, &SerializationOptions::strict()).unwrap();
//! assert_eq!(json, r#"{"Name":"Alice","Age":30}"#);
//!
//! // Extensions are on by default: the root carries the type table.
//! let json = reflect_json::to_string(&person).unwrap();
//! assert_eq!(json, r#"{"___types":{"Person":1},"___type":1,"Name":"Alice","Age":30}"#);
//! ```
//!
//! ## Working with Dynamic Values
//!
//! ```rust
//! use reflect_json::value;
//!
//! let bag = value!({
//!     "name": "test",
//!     "values": [1, 2, 3]
//! });
//! assert_eq!(reflect_json::to_string(&bag).unwrap(), r#"{"name":"test","values":[1,2,3]}"#);
//! ```
//!
//! ## Extension Keys
//!
//! With `use_extensions` on, output may carry these reserved keys:
//! - `___type`: the object's type name, or its id in `___types`
//! - `___types`: the global type table, written once on the root object
//! - `___map`: runtime type names of loosely declared members
//! - `___i`: a back-reference to an object already written in the pass
//!
//! Back-references are written whenever an object repeats, with or without
//! extensions, unless `inline_circular_references` is set.

pub mod accessor;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod formatter;
pub mod impls;
pub mod options;
pub mod reflect;
pub mod registry;
pub mod ser;
pub mod shape;
mod sync;
pub mod tracker;
pub mod types;
pub mod value;

// Re-export commonly used items at the crate root
pub use accessor::{Access, AccessError, AccessorCompiler, CompileError, Read};
pub use descriptor::{MemberDescriptor, TypeDescriptor, TypeDescriptorCache};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use formatter::{pretty_print, pretty_print_with_indent};
pub use options::SerializationOptions;
pub use reflect::{AsAny, Elements, Entries, EnumValue, Identity, Kind, Object, ObjectRef, Reflect, Timestamp};
pub use registry::{CustomType, CustomTypeRegistry};
pub use ser::Serializer;
pub use shape::{DeclaredMember, MemberBuilder, MemberKind, Shape, TypeShape};
pub use tracker::{GlobalTypeTable, ReferenceTracker};
pub use types::{ext_key, limits, Category};
pub use value::{Number, Value};

#[doc(hidden)]
pub use indexmap::IndexMap;

// The reflect_object!, reflect_enum! and value! macros are exported at crate root via #[macro_export]

/// Serialize a value with default options.
///
/// # Example
///
/// ```rust
/// use reflect_json::to_string;
///
/// assert_eq!(to_string(&vec![1, 2, 3]).unwrap(), "[1,2,3]");
/// assert_eq!(to_string(&"tab\there").unwrap(), r#""tab\there""#);
/// ```
pub fn to_string(value: &dyn Reflect) -> Result<String> {
    to_string_with_options(value, &SerializationOptions::default())
}

/// Serialize a value with the given options.
///
/// Invalid option combinations are rejected before anything is written.
pub fn to_string_with_options(
    value: &dyn Reflect,
    options: &SerializationOptions,
) -> Result<String> {
    Serializer::new(options)?.serialize(value)
}

/// Serialize a value with the given options, then re-indent it with
/// [`pretty_print`].
pub fn to_string_pretty(
    value: &dyn Reflect,
    options: &SerializationOptions,
) -> Result<String> {
    let json = to_string_with_options(value, options)?;
    Ok(pretty_print(&json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roots() {
        assert_eq!(to_string(&42i32).unwrap(), "42");
        assert_eq!(to_string(&true).unwrap(), "true");
        assert_eq!(to_string(&()).unwrap(), "null");
        assert_eq!(to_string(&Some("x")).unwrap(), r#""x""#);
        assert_eq!(to_string(&None::<i32>).unwrap(), "null");
    }

    #[test]
    fn test_boxed_root() {
        let boxed: Box<dyn Reflect> = Box::new(vec![1u16, 2]);
        assert_eq!(to_string(&*boxed).unwrap(), "[1,2]");
        assert_eq!(to_string(&boxed).unwrap(), "[1,2]");
    }

    #[test]
    fn test_pretty() {
        let mut scores = IndexMap::new();
        scores.insert("a".to_string(), vec![1, 2]);
        let pretty = to_string_pretty(&scores, &SerializationOptions::default()).unwrap();
        assert_eq!(pretty, "{\n   \"a\" : [\n      1,\n      2\n   ]\n}");
    }
}
