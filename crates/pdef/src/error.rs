//! Error types for pdef schema loading, encoding/decoding and the JSON
//! projection.

use thiserror::Error;

/// Broad classification shared by every error in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The schema is malformed (detected once, at load).
    Schema,
    /// The root version field does not match the schema version.
    UnsupportedVersion,
    /// A buffer, string or array does not fit the fixed layout.
    InvalidSize,
    /// An enum value has no text representation (or vice versa).
    InvalidEnumValue,
    /// A record value does not have the shape its layout requires.
    TypeMismatch,
    /// Malformed JSON input.
    Syntax,
    /// Compression, decompression or hash verification failed.
    Blob,
}

impl ErrorKind {
    /// Returns the short description used in log lines (e.g. "invalid size").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Schema => "schema error",
            ErrorKind::UnsupportedVersion => "unsupported pdata version",
            ErrorKind::InvalidSize => "invalid size",
            ErrorKind::InvalidEnumValue => "invalid enum value",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Blob => "blob error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error while resolving a pdef into a [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("pdef root must have a version field of type int")]
    MissingVersionField,

    #[error("{referenced_by}: undefined struct {name:?}")]
    UndefinedStruct { name: String, referenced_by: String },

    #[error("{referenced_by}: undefined enum {name:?}")]
    UndefinedEnum { name: String, referenced_by: String },

    #[error("cyclic struct reference: {cycle}")]
    CyclicStruct { cycle: String },

    #[error("duplicate struct {name:?}")]
    DuplicateStruct { name: String },

    #[error("duplicate enum {name:?}")]
    DuplicateEnum { name: String },

    #[error("struct {name:?}: duplicate field {field:?}")]
    DuplicateField { name: String, field: String },

    #[error("enum {name:?}: duplicate value {value:?}")]
    DuplicateEnumValue { name: String, value: String },

    #[error("enum {name:?} has {count} values (maximum {max})")]
    EnumTooLarge { name: String, count: usize, max: usize },

    #[error("struct {name:?} exceeds maximum size of {max} bytes")]
    StructTooLarge { name: String, max: usize },

    #[error("struct {name:?} exceeds maximum of {max} values")]
    TooManyValues { name: String, max: usize },
}

impl SchemaError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Schema
    }
}

/// Error during binary decoding.
///
/// A failed decode never yields a partially populated record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("decode {name:?} (v{version}): invalid size: expected pdef version, got {actual} bytes")]
    MissingVersion {
        name: String,
        version: i32,
        actual: usize,
    },

    #[error("decode {name:?} (v{version}): unsupported pdata version: got {found}")]
    UnsupportedVersion {
        name: String,
        version: i32,
        found: i32,
    },

    #[error("decode {name:?} (v{version}): invalid size: expected at least {min} bytes, got {actual}")]
    TooShort {
        name: String,
        version: i32,
        min: usize,
        actual: usize,
    },

    #[error("decode {name:?} (v{version}): invalid size: expected {expected} bytes, got {actual}")]
    InvalidSize {
        name: String,
        version: i32,
        expected: usize,
        actual: usize,
    },

    #[error("decode: unknown struct {name:?}")]
    UnknownStruct { name: String },
}

impl DecodeError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            DecodeError::MissingVersion { .. }
            | DecodeError::TooShort { .. }
            | DecodeError::InvalidSize { .. } => ErrorKind::InvalidSize,
            DecodeError::UnknownStruct { .. } => ErrorKind::Schema,
        }
    }
}

/// Error during binary encoding or JSON marshaling.
///
/// Encoding is all-or-nothing: no bytes are returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("encode {name:?} (v{version}): unsupported pdata version: got {found}")]
    UnsupportedVersion {
        name: String,
        version: i32,
        found: i32,
    },

    #[error("encode {name:?} (v{version}): invalid size: field {field:?}: string length {len} too long for field length {max}")]
    StringTooLong {
        name: String,
        version: i32,
        field: String,
        index: Option<usize>,
        len: usize,
        max: usize,
    },

    #[error("encode {name:?} (v{version}): invalid size: field {field:?}: array has {actual} elements, expected {expected}")]
    ArrayLength {
        name: String,
        version: i32,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("encode {name:?} (v{version}): field {field:?}: expected {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        version: i32,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("encode: record of struct {found:?} where {expected:?} was expected")]
    WrongStruct { expected: String, found: String },

    #[error("struct {name:?} has no field {field:?}")]
    UnknownField { name: String, field: String },

    #[error("json output failed: {0}")]
    Json(String),
}

impl EncodeError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            EncodeError::StringTooLong { .. } | EncodeError::ArrayLength { .. } => {
                ErrorKind::InvalidSize
            }
            EncodeError::TypeMismatch { .. }
            | EncodeError::WrongStruct { .. }
            | EncodeError::UnknownField { .. } => ErrorKind::TypeMismatch,
            EncodeError::Json(_) => ErrorKind::Syntax,
        }
    }
}

/// Error converting an enum between its ordinal and its text form.
///
/// Only raised by text/JSON conversions; the binary codec preserves every
/// ordinal unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumError {
    #[error("invalid enum value: invalid value {ordinal} for enum {name:?}")]
    InvalidOrdinal { name: String, ordinal: u8 },

    #[error("invalid enum value: invalid value {value:?} for enum {name:?}")]
    InvalidName { name: String, value: String },
}

impl EnumError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidEnumValue
    }
}

/// Error while reading the JSON projection back into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("unmarshal json: {0}")]
    Syntax(String),

    #[error("unmarshal {name:?} (v{version}): unsupported pdata version: got {found}")]
    UnsupportedVersion {
        name: String,
        version: i32,
        found: i32,
    },

    #[error("unmarshal json: field {field:?}: {source}")]
    InvalidEnumValue { field: String, source: EnumError },

    #[error("unmarshal json: invalid size: field {field:?}: string length {len} too long for field length {max}")]
    StringTooLong { field: String, len: usize, max: usize },

    #[error("unmarshal json: invalid size: field {field:?}: array has {actual} elements, expected {expected}")]
    ArrayLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("unmarshal json: field {field:?}: expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("unmarshal json: unknown field {field:?}")]
    UnknownField { field: String },
}

impl JsonError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JsonError::Syntax(_) => ErrorKind::Syntax,
            JsonError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            JsonError::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            JsonError::StringTooLong { .. } | JsonError::ArrayLength { .. } => {
                ErrorKind::InvalidSize
            }
            JsonError::TypeMismatch { .. } | JsonError::UnknownField { .. } => {
                ErrorKind::TypeMismatch
            }
        }
    }
}

/// Error while packing or unpacking a stored pdata blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),

    #[error("zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("pdata size {len} exceeds maximum {max}")]
    TooLarge { len: usize, max: usize },

    #[error("unknown pdata compression {0:?}")]
    UnknownCompression(String),

    #[error("invalid pdata hash {0:?}")]
    InvalidHash(String),

    #[error("pdata hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

impl BlobError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = DecodeError::UnsupportedVersion {
            name: "pdata".to_string(),
            version: 1,
            found: 2,
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);

        let err = EncodeError::StringTooLong {
            name: "pdata".to_string(),
            version: 1,
            field: "name".to_string(),
            index: None,
            len: 9,
            max: 8,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidSize);

        let err = JsonError::InvalidEnumValue {
            field: "class".to_string(),
            source: EnumError::InvalidName {
                name: "eClass".to_string(),
                value: "wizard".to_string(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::InvalidEnumValue);
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = DecodeError::InvalidSize {
            name: "sStats".to_string(),
            version: 34,
            expected: 12,
            actual: 11,
        };
        assert_eq!(
            err.to_string(),
            "decode \"sStats\" (v34): invalid size: expected 12 bytes, got 11"
        );

        let err = EncodeError::StringTooLong {
            name: "sLoadout".to_string(),
            version: 34,
            field: "loadouts[2].name".to_string(),
            index: Some(2),
            len: 40,
            max: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("sLoadout"));
        assert!(msg.contains("loadouts[2].name"));
        assert!(msg.contains("v34"));
    }
}
