// ABOUTME: Member categories, extension keys and default limits.
// ABOUTME: Categories are computed once per member from its declared type.

/// The category of a declared member type.
///
/// Computed once when a type is discovered and used as a fast-path hint by the
/// value writer. `Unknown` means the runtime value must always be inspected,
/// e.g. a `Box<dyn Reflect>` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Integer,
    LongInteger,
    Float,
    Text,
    Boolean,
    Temporal,
    Enum,
    Guid,
    Array,
    ByteArray,
    StringDictionary,
    Dictionary,
    Custom,
    Object,
    Unknown,
}

impl Category {
    /// Scalar categories cannot hold a value of a different runtime category,
    /// so the writer skips the custom-type lookup for them.
    #[inline]
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Category::Integer
                | Category::LongInteger
                | Category::Float
                | Category::Text
                | Category::Boolean
                | Category::Temporal
                | Category::Guid
                | Category::ByteArray
        )
    }

    /// True when the declared type says nothing about the runtime value.
    #[inline]
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Category::Unknown)
    }
}

/// Member names used by the JSON extensions.
pub mod ext_key {
    /// Runtime type tag written first in every object.
    pub const TYPE: &str = "___type";
    /// Global type table, inserted at the start of the root object.
    pub const TYPES: &str = "___types";
    /// Runtime type hints for members declared without a concrete type.
    pub const MAP: &str = "___map";
    /// Back-reference marker replacing an already written object.
    pub const REFERENCE: &str = "___i";
    /// Key of an entry in a non-string-keyed dictionary.
    pub const ENTRY_KEY: &str = "k";
    /// Value of an entry in a non-string-keyed dictionary.
    pub const ENTRY_VALUE: &str = "v";
}

/// Default limits and formatting constants.
pub mod limits {
    /// Maximum plain-object nesting depth.
    pub const DEFAULT_MAX_DEPTH: usize = 20;

    /// Indent unit used by the pretty-printer.
    pub const DEFAULT_INDENT: &str = "   ";

    /// Marker that excludes a member from discovery unless removed from the ignore-list.
    pub const DEFAULT_IGNORE_MARKER: &str = "json_ignore";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_categories() {
        assert!(Category::Integer.is_scalar());
        assert!(Category::Temporal.is_scalar());
        assert!(!Category::Enum.is_scalar());
        assert!(!Category::Object.is_scalar());
        assert!(!Category::Unknown.is_scalar());
        assert!(Category::Unknown.is_unknown());
    }
}
