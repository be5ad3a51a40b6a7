//! Error types.

use alloc::string::String;

use thiserror::Error;

use crate::WireType;

/// A name that is not a scalar type, returned by `FieldType::from_str`.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("unknown scalar type `{0}`")]
pub struct UnknownType(pub String);

/// A value lies outside the representable domain of its scalar type.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum RangeError {
    /// Not a signed 32 bit integer.
    #[error("{0} is not a valid 32 bit integer. The value must be between {min} and {max}.", min = i32::MIN, max = i32::MAX)]
    Int32(i128),
    /// Not a signed 64 bit integer.
    #[error("{0} is not a valid 64 bit integer. The value must be between {min} and {max}.", min = i64::MIN, max = i64::MAX)]
    Int64(i128),
    /// Not an unsigned 32 bit integer.
    #[error("{0} is not a valid 32 bit unsigned integer. The value must be between 0 and {max}.", max = u32::MAX)]
    Uint32(i128),
    /// Not an unsigned 64 bit integer.
    #[error("{0} is not a valid 64 bit unsigned integer. The value must be between 0 and {max}.", max = u64::MAX)]
    Uint64(i128),
    /// A finite value too large for a 32 bit float, carried as its `f64` bits.
    #[error("{} is not a valid 32 bit float. The magnitude must not exceed {max}.", from_bits(.0), max = f32::MAX)]
    Float(u64),
}

fn from_bits(bits: &u64) -> f64 {
    f64::from_bits(*bits)
}

/// An illegal field or schema declaration.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum DefinitionError {
    /// `packed` was requested on a length-delimited field.
    #[error("{ty} field `{field}` is not a valid field to be packed, only non length-delimited fields are valid")]
    Unpackable {
        /// Field name.
        field: String,
        /// Name of the field's type.
        ty: String,
    },
    /// `packed` was requested on a field that is not repeated.
    #[error("field `{field}` is packed but not repeated")]
    PackedNotRepeated {
        /// Field name.
        field: String,
    },
    /// Field number outside `1..=MAX_FIELD_NUMBER`.
    #[error("field `{field}` has invalid number {number}")]
    InvalidNumber {
        /// Field name.
        field: String,
        /// The rejected number.
        number: u32,
    },
    /// Two fields share a name.
    #[error("message {message} declares field `{field}` twice")]
    DuplicateName {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Two fields share a number.
    #[error("message {message} has fields with duplicate number {number}")]
    DuplicateNumber {
        /// Message name.
        message: String,
        /// Field number.
        number: u32,
    },
}

/// Error returned when addressing a field the schema does not declare.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AccessError {
    /// No field with this name.
    #[error("message {message} has no field `{field}`")]
    UnknownField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
}

/// Error returned while encoding a message.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum EncodeError {
    /// A field value is out of range for its type.
    #[error("field `{field}`: {source}")]
    Range {
        /// Field name.
        field: String,
        /// The range violation.
        source: RangeError,
    },
    /// A field holds a value of the wrong shape.
    #[error("field `{field}` expects a {expected} value")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// What the field type accepts.
        expected: &'static str,
    },
    /// A required field is unset and has no default.
    #[error("required field `{field}` is not set")]
    MissingRequired {
        /// Field name.
        field: String,
    },
    /// Embedded messages nest deeper than the configured limit.
    #[error("message nesting exceeds the depth limit of {limit}")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// The message schema is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// A field was addressed by a name the schema does not declare.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Error returned while decoding.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum DecodeError {
    /// A read requested more bytes than remain.
    #[error("buffer underflow: needed {needed} bytes, {remaining} remaining")]
    Underflow {
        /// Bytes requested.
        needed: usize,
        /// Bytes available.
        remaining: usize,
    },
    /// A varint is longer than 10 bytes or overflows 64 bits.
    #[error("varint overflows 64 bits")]
    VarintOverflow,
    /// Unsupported wire type in a key.
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    /// Field number zero or above the maximum.
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),
    /// The next record belongs to a different field than the one being read.
    #[error("expected field {expected}, found field {actual}")]
    UnexpectedField {
        /// Number of the field being read.
        expected: u32,
        /// Number found on the wire.
        actual: u32,
    },
    /// A field arrived with a wire type its declaration does not allow.
    #[error("field `{field}` expects wire type {expected:?}, found {actual:?}")]
    WireTypeMismatch {
        /// Field name.
        field: String,
        /// Wire type of the declaration.
        expected: WireType,
        /// Wire type found on the wire.
        actual: WireType,
    },
    /// A string field is not valid UTF-8.
    #[error("field `{field}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Field name.
        field: String,
    },
    /// A decoded value is out of range for its type.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// A required field was not present.
    #[error("required field `{field}` is missing")]
    MissingRequired {
        /// Field name.
        field: String,
    },
    /// A value has the wrong shape for the Rust type it is converted into.
    #[error("field `{field}` expects a {expected} value")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// What the target type accepts.
        expected: &'static str,
    },
    /// A value has the wrong shape for the Rust type it is converted into.
    #[error("expected a {expected} value")]
    UnexpectedValue {
        /// What the target type accepts.
        expected: &'static str,
    },
    /// An integer does not name a variant of the enumeration.
    #[error("{value} is not a value of enumeration {name}")]
    UnknownEnumValue {
        /// Enumeration name.
        name: &'static str,
        /// The unknown value.
        value: i32,
    },
    /// A fixed capacity container is too small for the decoded value.
    #[error("value does not fit in capacity {capacity}")]
    CapacityExceeded {
        /// Container capacity.
        capacity: usize,
    },
    /// Embedded messages nest deeper than the configured limit.
    #[error("message nesting exceeds the depth limit of {limit}")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// The message schema is invalid.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}
