// ABOUTME: Error types for reflection-driven JSON serialization.
// ABOUTME: Each variant carries a stable name so hosts can match failures without parsing messages.

use std::fmt;

/// The result type for serialization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering types or serializing a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Option combination rejected before traversal starts.
    InvalidOptions(String),

    /// A custom type registration was missing one of its functions.
    CustomTypeRejected {
        type_name: String,
        message: String,
    },

    /// Plain-object nesting went past the configured limit.
    /// The whole pass is aborted; no partial output is returned.
    MaxDepthExceeded { max_depth: usize },

    /// A member accessor failed while reading an instance.
    Accessor {
        type_name: String,
        member: String,
        message: String,
    },

    /// Member discovery failed for a type.
    Introspection {
        type_name: String,
        member: String,
        message: String,
    },

    /// A string-keyed dictionary produced a key that is not text.
    InvalidObjectKey,

    /// Expected an object key but a value was written.
    ExpectedObjectKey,

    /// Container ended while expecting an object value.
    ExpectedObjectValue,

    /// Tried to close more containers than were opened.
    UnbalancedContainers,

    /// Output was finished with containers still open.
    UnclosedContainer,

    /// Custom error message.
    Custom(String),
}

impl Error {
    /// Returns the stable error type name.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidOptions(_) => "invalid_options",
            Error::CustomTypeRejected { .. } => "custom_type_rejected",
            Error::MaxDepthExceeded { .. } => "max_depth_exceeded",
            Error::Accessor { .. } => "accessor_failed",
            Error::Introspection { .. } => "introspection_failed",
            Error::InvalidObjectKey => "invalid_object_key",
            Error::ExpectedObjectKey => "expected_object_key",
            Error::ExpectedObjectValue => "expected_object_value",
            Error::UnbalancedContainers => "unbalanced_containers",
            Error::UnclosedContainer => "unclosed_container",
            Error::Custom(_) => "custom",
        }
    }

    /// True for failures caused by configuration rather than by the data.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidOptions(_) | Error::CustomTypeRejected { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidOptions(msg) => write!(f, "invalid serialization options: {msg}"),
            Error::CustomTypeRejected { type_name, message } => {
                write!(f, "custom type `{type_name}` rejected: {message}")
            }
            Error::MaxDepthExceeded { max_depth } => {
                write!(f, "serializer encountered maximum depth of {max_depth}")
            }
            Error::Accessor {
                type_name,
                member,
                message,
            } => write!(f, "failed to read `{type_name}::{member}`: {message}"),
            Error::Introspection {
                type_name,
                member,
                message,
            } => write!(f, "cannot describe `{type_name}::{member}`: {message}"),
            Error::InvalidObjectKey => write!(f, "non-string dictionary key"),
            Error::ExpectedObjectKey => write!(f, "expected object key (string)"),
            Error::ExpectedObjectValue => write!(f, "expected object value"),
            Error::UnbalancedContainers => write!(f, "tried to close too many containers"),
            Error::UnclosedContainer => write!(f, "unclosed container"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::Custom("formatting failed".into())
    }
}
