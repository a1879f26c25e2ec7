// ABOUTME: Serialization options controlling output shape and extension keys.
// ABOUTME: Options are validated once per pass before any traversal starts.

use crate::error::{Error, Result};
use crate::types::limits;
use serde::{Deserialize, Serialize};

/// Configuration for one serialization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationOptions {
    /// Convert temporal values to UTC and suffix `Z` (default: true)
    pub use_utc_timestamps: bool,
    /// Append `.fff` to timestamps (default: false)
    pub include_milliseconds_in_timestamps: bool,
    /// Write members and string-dictionary entries whose value is null (default: true)
    pub emit_null_values: bool,
    /// Lowercase member names and string-dictionary keys (default: false)
    pub lowercase_member_names: bool,
    /// Write `___type` tags and `___map` hints (default: true)
    pub use_extensions: bool,
    /// Replace `___type` names with ids resolved by a `___types` table; requires
    /// `use_extensions` (default: true)
    pub use_global_type_table: bool,
    /// Expand repeated objects instead of writing `{"___i":id}` (default: false)
    pub inline_circular_references: bool,
    /// Maximum plain-object nesting depth; exceeding it fails the pass
    pub max_depth: usize,
    /// Write every non-finite float as `"NaN"`; when false, infinities are
    /// written as `"Infinity"` and `"-Infinity"` (default: true)
    pub use_compact_floating_point_encoding: bool,
    /// Write enums as their discriminant instead of their name (default: false)
    pub serialize_enums_as_integers: bool,
    /// Escape every char outside printable ASCII as `\uXXXX` (default: true)
    pub escape_non_ascii: bool,
    /// Write guids as base64 of their raw bytes instead of hyphenated text (default: true)
    pub guid_as_base64: bool,
    /// Write computed properties that have no setter (default: false)
    pub show_read_only_properties: bool,
    /// Write string-keyed dictionaries as `[{"k":..,"v":..}]` (default: false)
    pub string_dictionaries_as_pairs: bool,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        Self {
            use_utc_timestamps: true,
            include_milliseconds_in_timestamps: false,
            emit_null_values: true,
            lowercase_member_names: false,
            use_extensions: true,
            use_global_type_table: true,
            inline_circular_references: false,
            max_depth: limits::DEFAULT_MAX_DEPTH,
            use_compact_floating_point_encoding: true,
            serialize_enums_as_integers: false,
            escape_non_ascii: true,
            guid_as_base64: true,
            show_read_only_properties: false,
            string_dictionaries_as_pairs: false,
        }
    }
}

impl SerializationOptions {
    /// Defaults without extension keys: plain JSON apart from the `"NaN"` marker
    /// and `{"___i":id}` back-references.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            use_extensions: false,
            use_global_type_table: false,
            ..Self::default()
        }
    }

    /// Reject option combinations that cannot be honored.
    pub fn validate(&self) -> Result<()> {
        if self.use_global_type_table && !self.use_extensions {
            return Err(Error::InvalidOptions(
                "`use_global_type_table` requires `use_extensions`".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidOptions("`max_depth` must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = SerializationOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.max_depth, 20);
        assert!(options.use_global_type_table);
        assert!(SerializationOptions::strict().validate().is_ok());
    }

    #[test]
    fn test_global_table_requires_extensions() {
        let options = SerializationOptions {
            use_extensions: false,
            ..SerializationOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("use_global_type_table"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let options = SerializationOptions {
            max_depth: 0,
            ..SerializationOptions::default()
        };
        assert_eq!(options.validate().unwrap_err().error_type(), "invalid_options");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let options: SerializationOptions =
            serde_json::from_str(r#"{"lowercase_member_names": true, "max_depth": 5}"#).unwrap();
        assert!(options.lowercase_member_names);
        assert_eq!(options.max_depth, 5);
        assert!(options.use_extensions);
        assert!(options.escape_non_ascii);
    }
}
