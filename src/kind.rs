//! Field types.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::{MessageSchema, UnknownType, WireType};

/// The type of a field: one variant per protobuf scalar type, plus enumerations and embedded
/// messages.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum(Arc<EnumDescriptor>),
    Message(Arc<MessageSchema>),
}

impl FieldType {
    /// Wire type values of this type are written with.
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Bool
            | FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Enum(_) => WireType::Varint,
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::SixtyFourBit,
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::ThirtyTwoBit,
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => WireType::LengthDelimited,
        }
    }

    /// Whether repeated values of this type may be packed.
    pub fn is_packable(&self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// The protobuf name of the type. Enumerations and messages report their own name.
    pub fn name(&self) -> &str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Sint32 => "sint32",
            FieldType::Sint64 => "sint64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::Sfixed32 => "sfixed32",
            FieldType::Sfixed64 => "sfixed64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Enum(e) => e.name(),
            FieldType::Message(m) => m.name(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = UnknownType;

    /// Resolve a scalar type by its protobuf name, e.g. `"string"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bool" => FieldType::Bool,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uint32" => FieldType::Uint32,
            "uint64" => FieldType::Uint64,
            "sint32" => FieldType::Sint32,
            "sint64" => FieldType::Sint64,
            "fixed32" => FieldType::Fixed32,
            "fixed64" => FieldType::Fixed64,
            "sfixed32" => FieldType::Sfixed32,
            "sfixed64" => FieldType::Sfixed64,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "string" => FieldType::String,
            "bytes" => FieldType::Bytes,
            _ => return Err(UnknownType(s.into())),
        })
    }
}

impl From<Arc<MessageSchema>> for FieldType {
    fn from(schema: Arc<MessageSchema>) -> Self {
        FieldType::Message(schema)
    }
}

impl From<Arc<EnumDescriptor>> for FieldType {
    fn from(descriptor: Arc<EnumDescriptor>) -> Self {
        FieldType::Enum(descriptor)
    }
}

/// Named values of an enumeration.
///
/// Enum fields carry plain integers; the names are informational and values outside the list
/// are still accepted as long as they fit in 32 bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Add a named value.
    pub fn value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.values.push((name.into(), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Look up the value with the given name.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Look up the name of the given value.
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.values.iter().find(|(_, v)| *v == value).map(|(n, _)| n.as_str())
    }
}
