#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod buffer;
mod error;
mod field;
mod impls;
mod kind;
mod limits;
mod message;
mod range;
mod read;
mod schema;
mod value;
mod wire;

use alloc::sync::Arc;
use alloc::vec::Vec;

pub use buffer::ByteBuffer;
pub use error::{AccessError, DecodeError, DefinitionError, EncodeError, RangeError, UnknownType};
pub use field::{Field, FieldOptions, Label};
pub use kind::{EnumDescriptor, FieldType};
pub use limits::Limits;
pub use message::DynamicMessage;
pub use range::{validate_float, validate_int32, validate_int64, validate_uint32, validate_uint64};
pub use schema::{MessageSchema, MessageSchemaBuilder};
pub use value::Value;
pub use wire::{key, split_key, WireType, MAX_FIELD_NUMBER};

pub mod encoding {
    //! Encoding and decoding of primitive types.
    pub use crate::buffer::{zigzag_decode32, zigzag_decode64, zigzag_encode32, zigzag_encode64};
    pub use crate::read::*;
}

// Re-export #[derive(Message, Enumeration)].
#[cfg(feature = "derive")]
#[allow(unused_imports)]
#[macro_use]
extern crate wireproto_derive;
#[cfg(feature = "derive")]
#[doc(hidden)]
pub use wireproto_derive::*;

#[doc(hidden)]
pub mod __private {
    pub use alloc::string::String;
    pub use alloc::sync::Arc;
}

/// A Rust type with a protobuf schema.
///
/// Usually implemented with `#[derive(Message)]`, which maps each struct field to a schema field
/// and converts between the struct and a [`DynamicMessage`].
pub trait Message: Sized {
    /// Build the schema of the message.
    fn schema() -> Result<Arc<MessageSchema>, DefinitionError>;
    /// Convert into a message of [`Self::schema`].
    fn to_dynamic(&self) -> Result<DynamicMessage, EncodeError>;
    /// Convert from a decoded message.
    fn from_dynamic(msg: &DynamicMessage) -> Result<Self, DecodeError>;

    /// Serialize the message.
    fn encode(&self) -> Result<ByteBuffer, EncodeError> {
        self.to_dynamic()?.encode()
    }

    /// Deserialize the message.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let msg = DynamicMessage::decode(Self::schema()?, buf)?;
        Self::from_dynamic(&msg)
    }
}

/// A Rust enum with a protobuf enumeration descriptor.
///
/// Usually implemented with `#[derive(Enumeration)]`.
pub trait Enumeration: Sized {
    /// The named values of the enumeration.
    fn descriptor() -> Arc<EnumDescriptor>;
    /// The integer value of the variant.
    fn to_i32(&self) -> i32;
    /// The variant with the given value.
    fn from_i32(value: i32) -> Option<Self>;
}

/// Conversion between a Rust type and a single field [`Value`].
pub trait FieldValue: Sized {
    /// Convert into a value.
    fn to_value(&self) -> Result<Value, EncodeError>;
    /// Convert from a value.
    fn from_value(value: &Value) -> Result<Self, DecodeError>;
}

/// A container for the values of a repeated field.
///
/// Decoding pushes one element at a time so that fixed capacity containers report overflow
/// instead of panicking.
pub trait RepeatedValue: Default {
    /// Element type.
    type Item: FieldValue;

    /// Append one element.
    fn try_push(&mut self, item: Self::Item) -> Result<(), DecodeError>;

    /// Build the container from decoded values.
    fn from_values(values: &[Value]) -> Result<Self, DecodeError> {
        let mut out = Self::default();
        for value in values {
            out.try_push(Self::Item::from_value(value)?)?;
        }
        Ok(out)
    }
}

/// Serialize a message to a byte vector.
pub fn write<M: Message>(msg: &M) -> Result<Vec<u8>, EncodeError> {
    Ok(msg.encode()?.into_bytes())
}

/// Deserialize a message from a byte slice.
pub fn read<M: Message>(buf: &[u8]) -> Result<M, DecodeError> {
    M::decode(buf)
}
