//! Error types for typed-data validation and hashing.

use std::fmt;

use crate::encoding::HexError;

/// Dotted location of a value inside a typed-data document.
///
/// Paths are rooted at `domain` or `message` for values (`message.to.wallet`,
/// `message.items[2]`) and at the type name for declarations (`Mail.from`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// Creates a path with a single root segment.
    pub fn root(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the path extended with a named member.
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_owned())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    /// Returns the path extended with an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while validating or hashing typed data.
///
/// Every value-level error names the field path so that a caller can build a
/// user-facing message without re-walking the document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Eip712Error {
    /// A hex-encoded value is not valid `0x`-prefixed hex.
    #[error("{path}: malformed hex value: {source}")]
    MalformedHex {
        /// Location of the value.
        path: FieldPath,
        /// Underlying decoding failure.
        #[source]
        source: HexError,
    },
    /// A value does not satisfy its declared ABI type.
    #[error("{path}: invalid {ty} value: {reason}")]
    InvalidFieldValue {
        /// Location of the value.
        path: FieldPath,
        /// Declared type of the value.
        ty: String,
        /// What is wrong with the value.
        reason: String,
    },
    /// A type string is neither a primitive ABI type nor a declared struct.
    #[error("{path}: unknown type {ty}")]
    UnknownType {
        /// Declaration or value location referencing the type.
        path: FieldPath,
        /// The unresolved type string.
        ty: String,
    },
    /// A declared struct member has no value.
    #[error("{path}: missing value")]
    MissingFieldValue {
        /// Location of the missing value.
        path: FieldPath,
    },
    /// A struct type is declared more than once.
    #[error("type {0} is defined more than once")]
    DuplicateType(String),
    /// A declared struct name is not a valid identifier or shadows a primitive.
    #[error("invalid struct type name {0:?}")]
    InvalidTypeName(String),
    /// The requested primary type is not declared.
    #[error("primary type {0} is not declared")]
    UnknownPrimaryType(String),
    /// No primary type was given and no struct type is declared.
    #[error("typed data declares no struct type to use as primary type")]
    MissingPrimaryType,
    /// Struct or array nesting exceeds the configured maximum depth.
    #[error("{path}: nesting exceeds the maximum depth of {max_depth}")]
    RecursionLimitExceeded {
        /// Location at which the limit was hit.
        path: FieldPath,
        /// The configured limit.
        max_depth: usize,
    },
    /// The typed-data document could not be parsed.
    #[error("invalid typed data document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Eip712Error {
    /// Creates an [`Eip712Error::InvalidFieldValue`].
    pub fn invalid_value(
        path: &FieldPath,
        ty: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldValue {
            path: path.clone(),
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the field path the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Self::MalformedHex { path, .. }
            | Self::InvalidFieldValue { path, .. }
            | Self::UnknownType { path, .. }
            | Self::MissingFieldValue { path }
            | Self::RecursionLimitExceeded { path, .. } => Some(path),
            Self::DuplicateType(_)
            | Self::InvalidTypeName(_)
            | Self::UnknownPrimaryType(_)
            | Self::MissingPrimaryType
            | Self::Json(_) => None,
        }
    }
}
