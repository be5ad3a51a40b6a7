use alloc::string::String;
use alloc::vec::Vec;

use crate::range::{validate_float, validate_int32, validate_int64, validate_uint32, validate_uint64};
use crate::read::ByteReader;
use crate::wire::{key, MAX_FIELD_NUMBER};
use crate::{
    ByteBuffer, DecodeError, DefinitionError, DynamicMessage, EncodeError, FieldType, Limits, RangeError, Value,
    WireType,
};

/// How many values a field holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

/// Per-field options given at declaration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOptions {
    default: Option<Value>,
    packed: bool,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value read back while the field is unset.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Write repeated values as a single length-delimited run.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }
}

/// A named, numbered field of a message schema.
///
/// Fields are immutable once constructed and shared by every message of their schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    ty: FieldType,
    name: String,
    number: u32,
    label: Label,
    packed: bool,
    default: Option<Value>,
}

impl Field {
    /// Declare a field.
    ///
    /// Fails if `number` is outside `1..=MAX_FIELD_NUMBER`, or if `packed` is requested on a
    /// length-delimited type or on a field that is not repeated.
    pub fn new(
        ty: FieldType,
        name: impl Into<String>,
        number: u32,
        label: Label,
        options: FieldOptions,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(DefinitionError::InvalidNumber { field: name, number });
        }
        if options.packed {
            if !ty.is_packable() {
                return Err(DefinitionError::Unpackable {
                    field: name,
                    ty: ty.name().into(),
                });
            }
            if label != Label::Repeated {
                return Err(DefinitionError::PackedNotRepeated { field: name });
            }
        }
        Ok(Self {
            ty,
            name,
            number,
            label,
            packed: options.packed,
            default: options.default,
        })
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Key written before each value of this field.
    pub fn key(&self) -> u64 {
        key(self.number, self.ty.wire_type())
    }

    /// Encode the field's current value, `None` if unset.
    ///
    /// Repeated fields expect a [`Value::List`] and are written packed or as one key/value pair
    /// per element. Nothing is written if the encode fails.
    pub fn encode(&self, buf: &mut ByteBuffer, value: Option<&Value>) -> Result<(), EncodeError> {
        self.encode_at(buf, value, &Limits::default(), 0)
    }

    pub(crate) fn encode_at(
        &self,
        buf: &mut ByteBuffer,
        value: Option<&Value>,
        limits: &Limits,
        depth: usize,
    ) -> Result<(), EncodeError> {
        let Some(value) = value else {
            if self.is_required() {
                return Err(EncodeError::MissingRequired {
                    field: self.name.clone(),
                });
            }
            return Ok(());
        };

        if !self.is_repeated() {
            return self.encode_one_at(buf, value, limits, depth);
        }
        let values = value.as_list().ok_or_else(|| self.mismatch("list"))?;
        if self.packed {
            self.encode_packed_at(buf, values, limits, depth)
        } else {
            buf.atomically(|buf| {
                for value in values {
                    self.encode_one_at(buf, value, limits, depth)?;
                }
                Ok(())
            })
        }
    }

    /// Encode a single value: key, then payload.
    pub fn encode_one(&self, buf: &mut ByteBuffer, value: &Value) -> Result<(), EncodeError> {
        self.encode_one_at(buf, value, &Limits::default(), 0)
    }

    fn encode_one_at(&self, buf: &mut ByteBuffer, value: &Value, limits: &Limits, depth: usize) -> Result<(), EncodeError> {
        buf.atomically(|buf| {
            buf.write_varint(self.key());
            self.write_payload(buf, value, limits, depth)
        })
    }

    /// Encode values as one length-delimited run of payloads sharing a single key.
    ///
    /// An empty run writes nothing.
    pub fn encode_packed(&self, buf: &mut ByteBuffer, values: &[Value]) -> Result<(), EncodeError> {
        self.encode_packed_at(buf, values, &Limits::default(), 0)
    }

    fn encode_packed_at(
        &self,
        buf: &mut ByteBuffer,
        values: &[Value],
        limits: &Limits,
        depth: usize,
    ) -> Result<(), EncodeError> {
        if !self.ty.is_packable() {
            return Err(DefinitionError::Unpackable {
                field: self.name.clone(),
                ty: self.ty.name().into(),
            }
            .into());
        }
        if values.is_empty() {
            return Ok(());
        }

        let mut scratch = ByteBuffer::new();
        for value in values {
            self.write_payload(&mut scratch, value, limits, depth)?;
        }
        buf.write_key(self.number, WireType::LengthDelimited)
            .write_length_delimited(scratch.bytes());
        Ok(())
    }

    fn write_payload(&self, buf: &mut ByteBuffer, value: &Value, limits: &Limits, depth: usize) -> Result<(), EncodeError> {
        match &self.ty {
            FieldType::Bool => {
                buf.write_bool(value.as_bool().ok_or_else(|| self.mismatch("bool"))?);
            }
            FieldType::Int32 | FieldType::Enum(_) => {
                let v = self.checked(value, validate_int32)?;
                buf.write_signed_varint(v as i64);
            }
            FieldType::Int64 => {
                buf.write_signed_varint(self.checked(value, validate_int64)?);
            }
            FieldType::Uint32 => {
                buf.write_varint(self.checked(value, validate_uint32)? as u64);
            }
            FieldType::Uint64 => {
                buf.write_varint(self.checked(value, validate_uint64)?);
            }
            FieldType::Sint32 => {
                buf.write_zigzag32(self.checked(value, validate_int32)?);
            }
            FieldType::Sint64 => {
                buf.write_zigzag64(self.checked(value, validate_int64)?);
            }
            FieldType::Fixed32 => {
                buf.write_fixed32(self.checked(value, validate_uint32)?);
            }
            FieldType::Fixed64 => {
                buf.write_fixed64(self.checked(value, validate_uint64)?);
            }
            FieldType::Sfixed32 => {
                buf.write_sfixed32(self.checked(value, validate_int32)?);
            }
            FieldType::Sfixed64 => {
                buf.write_sfixed64(self.checked(value, validate_int64)?);
            }
            FieldType::Float => {
                let v = value.as_f64().ok_or_else(|| self.mismatch("float"))?;
                buf.write_float(validate_float(v).map_err(|source| self.range(source))?);
            }
            FieldType::Double => {
                buf.write_double(value.as_f64().ok_or_else(|| self.mismatch("double"))?);
            }
            FieldType::String => {
                buf.write_length_delimited(value.as_str().ok_or_else(|| self.mismatch("string"))?.as_bytes());
            }
            FieldType::Bytes => {
                buf.write_length_delimited(value.as_bytes().ok_or_else(|| self.mismatch("bytes"))?);
            }
            FieldType::Message(schema) => {
                let msg = value
                    .as_message()
                    .filter(|msg| msg.schema() == schema)
                    .ok_or_else(|| self.mismatch("embedded message"))?;
                let mut scratch = ByteBuffer::new();
                msg.encode_at(&mut scratch, limits, depth + 1)?;
                buf.write_length_delimited(scratch.bytes());
            }
        }
        Ok(())
    }

    fn checked<T>(&self, value: &Value, validate: fn(i128) -> Result<T, RangeError>) -> Result<T, EncodeError> {
        let v = value.as_int().ok_or_else(|| self.mismatch("integer"))?;
        validate(v).map_err(|source| self.range(source))
    }

    fn range(&self, source: RangeError) -> EncodeError {
        EncodeError::Range {
            field: self.name.clone(),
            source,
        }
    }

    fn mismatch(&self, expected: &'static str) -> EncodeError {
        EncodeError::TypeMismatch {
            field: self.name.clone(),
            expected,
        }
    }

    /// Decode the next key/value pair from the front of `buf`, which must belong to this field.
    pub fn decode_one(&self, buf: &mut ByteBuffer) -> Result<Value, DecodeError> {
        buf.consume(|r| {
            self.read_key(r, self.ty.wire_type())?;
            self.read_payload(r, &Limits::default(), 0)
        })
    }

    /// Decode a packed run of values from the front of `buf`.
    pub fn decode_packed(&self, buf: &mut ByteBuffer) -> Result<Vec<Value>, DecodeError> {
        buf.consume(|r| {
            self.read_key(r, WireType::LengthDelimited)?;
            self.read_packed(r.read_length_delimited()?)
        })
    }

    fn read_key(&self, r: &mut ByteReader<'_>, expected: WireType) -> Result<(), DecodeError> {
        let (number, actual) = r.read_key()?;
        if number != self.number {
            return Err(DecodeError::UnexpectedField {
                expected: self.number,
                actual: number,
            });
        }
        if actual != expected {
            return Err(self.wire_mismatch(actual));
        }
        Ok(())
    }

    pub(crate) fn wire_mismatch(&self, actual: WireType) -> DecodeError {
        DecodeError::WireTypeMismatch {
            field: self.name.clone(),
            expected: self.ty.wire_type(),
            actual,
        }
    }

    fn read_payload(&self, r: &mut ByteReader<'_>, limits: &Limits, depth: usize) -> Result<Value, DecodeError> {
        if self.ty.wire_type() == WireType::LengthDelimited {
            self.read_delimited(r.read_length_delimited()?, limits, depth)
        } else {
            self.read_scalar(r)
        }
    }

    /// Read the values of a packed run, `data` excluding the length prefix.
    pub(crate) fn read_packed(&self, data: &[u8]) -> Result<Vec<Value>, DecodeError> {
        let mut r = ByteReader::new(data);
        let mut values = Vec::new();
        while !r.eof() {
            values.push(self.read_scalar(&mut r)?);
        }
        Ok(values)
    }

    /// Read one value of a varint or fixed-width type.
    pub(crate) fn read_scalar(&self, r: &mut ByteReader<'_>) -> Result<Value, DecodeError> {
        Ok(match self.ty {
            FieldType::Bool => Value::Bool(r.read_bool()?),
            FieldType::Int32 | FieldType::Enum(_) => Value::Int(validate_int32(r.read_signed_varint()? as i128)? as i128),
            FieldType::Int64 => Value::Int(r.read_signed_varint()? as i128),
            FieldType::Uint32 => Value::Int(validate_uint32(r.read_varint()? as i128)? as i128),
            FieldType::Uint64 => Value::Int(r.read_varint()? as i128),
            FieldType::Sint32 => Value::Int(r.read_zigzag32()? as i128),
            FieldType::Sint64 => Value::Int(r.read_zigzag64()? as i128),
            FieldType::Fixed32 => Value::Int(r.read_fixed32()? as i128),
            FieldType::Fixed64 => Value::Int(r.read_fixed64()? as i128),
            FieldType::Sfixed32 => Value::Int(r.read_sfixed32()? as i128),
            FieldType::Sfixed64 => Value::Int(r.read_sfixed64()? as i128),
            FieldType::Float => Value::Float(r.read_float()?),
            FieldType::Double => Value::Double(r.read_double()?),
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => {
                return Err(self.wire_mismatch(WireType::Varint));
            }
        })
    }

    /// Read one value of a length-delimited type, `data` excluding the length prefix.
    pub(crate) fn read_delimited(&self, data: &[u8], limits: &Limits, depth: usize) -> Result<Value, DecodeError> {
        match &self.ty {
            FieldType::String => match core::str::from_utf8(data) {
                Ok(s) => Ok(Value::String(s.into())),
                Err(_) => Err(DecodeError::InvalidUtf8 {
                    field: self.name.clone(),
                }),
            },
            FieldType::Bytes => Ok(Value::Bytes(data.to_vec())),
            FieldType::Message(schema) => Ok(Value::Message(DynamicMessage::decode_at(
                schema.clone(),
                data,
                limits,
                depth + 1,
            )?)),
            _ => Err(self.wire_mismatch(WireType::LengthDelimited)),
        }
    }
}
