use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use tracing::{debug, trace};

use crate::read::ByteReader;
use crate::{AccessError, ByteBuffer, DecodeError, EncodeError, Field, Limits, MessageSchema, Value, WireType};

/// A message whose fields are addressed by name through its [`MessageSchema`].
///
/// Unset fields read back as their declared default, or `None` without one. Encoding never
/// modifies the message, so encoding the same message twice gives the same bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicMessage {
    schema: Arc<MessageSchema>,
    // Keyed by declaration index.
    values: BTreeMap<usize, Value>,
}

impl DynamicMessage {
    /// Create a message with every field unset.
    pub fn new(schema: Arc<MessageSchema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Create a message and set the given fields.
    pub fn with_values<K, V>(
        schema: Arc<MessageSchema>,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, AccessError>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut msg = Self::new(schema);
        for (name, value) in values {
            msg.set(name.as_ref(), value)?;
        }
        Ok(msg)
    }

    pub fn schema(&self) -> &Arc<MessageSchema> {
        &self.schema
    }

    fn index_of(&self, name: &str) -> Result<usize, AccessError> {
        self.schema.index_of(name).ok_or_else(|| AccessError::UnknownField {
            message: self.schema.name().into(),
            field: name.into(),
        })
    }

    /// The current value of a field, falling back to its default while unset.
    ///
    /// Returns `None` for unset fields without a default and for names the schema does not
    /// declare.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let i = self.schema.index_of(name)?;
        self.value_at(i)
    }

    fn value_at(&self, i: usize) -> Option<&Value> {
        self.values.get(&i).or_else(|| self.schema.fields()[i].default())
    }

    /// Whether a field has been set explicitly.
    pub fn is_set(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some_and(|i| self.values.contains_key(&i))
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, AccessError> {
        let i = self.index_of(name)?;
        self.values.insert(i, value.into());
        Ok(self)
    }

    /// Unset a field, returning the value it held.
    pub fn clear(&mut self, name: &str) -> Result<Option<Value>, AccessError> {
        let i = self.index_of(name)?;
        Ok(self.values.remove(&i))
    }

    /// Encode into a new buffer.
    pub fn encode(&self) -> Result<ByteBuffer, EncodeError> {
        let mut buf = ByteBuffer::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Append the encoded message to `buf`.
    ///
    /// On failure `buf` is left as it was.
    pub fn encode_into(&self, buf: &mut ByteBuffer) -> Result<(), EncodeError> {
        self.encode_with(buf, &Limits::default())
    }

    /// Like [`encode_into`](Self::encode_into), with custom limits.
    pub fn encode_with(&self, buf: &mut ByteBuffer, limits: &Limits) -> Result<(), EncodeError> {
        let res = self.encode_at(buf, limits, 0);
        if let Err(e) = &res {
            debug!(schema = self.schema.name(), error = %e, "encode failed");
        }
        res
    }

    pub(crate) fn encode_at(&self, buf: &mut ByteBuffer, limits: &Limits, depth: usize) -> Result<(), EncodeError> {
        if depth > limits.max_depth {
            return Err(EncodeError::DepthExceeded {
                limit: limits.max_depth,
            });
        }
        buf.atomically(|buf| {
            let start = buf.len();
            for (i, field) in self.schema.fields().iter().enumerate() {
                field.encode_at(buf, self.value_at(i), limits, depth)?;
            }
            trace!(
                schema = self.schema.name(),
                depth,
                len = buf.len() - start,
                "encoded message"
            );
            Ok(())
        })
    }

    /// Decode a message of the given schema.
    pub fn decode(schema: Arc<MessageSchema>, bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with(schema, bytes, &Limits::default())
    }

    /// Like [`decode`](Self::decode), with custom limits.
    pub fn decode_with(schema: Arc<MessageSchema>, bytes: &[u8], limits: &Limits) -> Result<Self, DecodeError> {
        Self::decode_at(schema, bytes, limits, 0)
    }

    pub(crate) fn decode_at(
        schema: Arc<MessageSchema>,
        bytes: &[u8],
        limits: &Limits,
        depth: usize,
    ) -> Result<Self, DecodeError> {
        if depth > limits.max_depth {
            return Err(DecodeError::DepthExceeded {
                limit: limits.max_depth,
            });
        }

        let mut msg = Self::new(schema.clone());
        let mut r = ByteReader::new(bytes);
        for raw in r.read_fields() {
            let raw = raw?;
            let Some(i) = schema.index_of_number(raw.number) else {
                trace!(number = raw.number, "skipping unknown field");
                continue;
            };
            let field = &schema.fields()[i];
            let wire_type = field.ty().wire_type();

            if field.is_repeated() {
                let values = if raw.wire_type == WireType::LengthDelimited && field.ty().is_packable() {
                    field.read_packed(raw.payload)?
                } else if raw.wire_type == wire_type {
                    let mut values = Vec::with_capacity(1);
                    values.push(read_raw(field, raw.payload, limits, depth)?);
                    values
                } else {
                    return Err(field.wire_mismatch(raw.wire_type));
                };
                if let Value::List(list) = msg.values.entry(i).or_insert_with(|| Value::List(Vec::new())) {
                    list.extend(values);
                }
            } else if raw.wire_type == wire_type {
                // Last one wins.
                msg.values.insert(i, read_raw(field, raw.payload, limits, depth)?);
            } else {
                return Err(field.wire_mismatch(raw.wire_type));
            }
        }

        for (i, field) in schema.fields().iter().enumerate() {
            if field.is_required() && msg.value_at(i).is_none() {
                return Err(DecodeError::MissingRequired {
                    field: field.name().into(),
                });
            }
        }

        trace!(schema = schema.name(), depth, len = bytes.len(), "decoded message");
        Ok(msg)
    }
}

fn read_raw(field: &Field, payload: &[u8], limits: &Limits, depth: usize) -> Result<Value, DecodeError> {
    if field.ty().wire_type() == WireType::LengthDelimited {
        field.read_delimited(payload, limits, depth)
    } else {
        field.read_scalar(&mut ByteReader::new(payload))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{FieldOptions, FieldType};

    fn request() -> Arc<MessageSchema> {
        MessageSchema::builder("Request")
            .required(FieldType::String, "name", 1)
            .build()
            .unwrap()
    }

    #[test]
    fn string_field() {
        let msg = DynamicMessage::with_values(request(), [("name", "testing")]).unwrap();
        assert_eq!(msg.get("name"), Some(&Value::String("testing".into())));
        assert_eq!(msg.encode().unwrap(), b"\x0A\x07testing");
    }

    #[test]
    fn setter() {
        let mut msg = DynamicMessage::new(request());
        assert_eq!(msg.get("name"), None);
        assert!(!msg.is_set("name"));
        msg.set("name", "testing").unwrap();
        assert!(msg.is_set("name"));
        assert_eq!(msg.get("name").and_then(Value::as_str), Some("testing"));
        assert_eq!(msg.clear("name"), Ok(Some(Value::String("testing".into()))));
        assert_eq!(msg.get("name"), None);
    }

    #[test]
    fn unknown_field() {
        let mut msg = DynamicMessage::new(request());
        assert_eq!(
            msg.set("nope", 1).err(),
            Some(AccessError::UnknownField {
                message: "Request".into(),
                field: "nope".into()
            })
        );
        assert!(DynamicMessage::with_values(request(), [("nope", 1)]).is_err());
        assert_eq!(msg.get("nope"), None);
    }

    #[test]
    fn embedded() {
        let inner = MessageSchema::builder("Request")
            .required(FieldType::String, "test", 1)
            .build()
            .unwrap();
        let outer = MessageSchema::builder("Envelope")
            .required(inner.clone(), "request", 1)
            .build()
            .unwrap();

        let request = DynamicMessage::with_values(inner, [("test", "testing")]).unwrap();
        let msg = DynamicMessage::with_values(outer.clone(), [("request", request)]).unwrap();
        let buf = msg.encode().unwrap();
        assert_eq!(buf, b"\x0A\x09\x0A\x07testing");
        assert_eq!(DynamicMessage::decode(outer, buf.bytes()), Ok(msg));
    }

    #[test]
    fn repeated_embedded() {
        let inner = MessageSchema::builder("Request")
            .required(FieldType::String, "test", 1)
            .build()
            .unwrap();
        let outer = MessageSchema::builder("Batch")
            .repeated(inner.clone(), "requests", 1)
            .build()
            .unwrap();

        let one = DynamicMessage::with_values(inner.clone(), [("test", "testing")]).unwrap();
        let two = DynamicMessage::with_values(inner, [("test", "test")]).unwrap();
        let msg = DynamicMessage::with_values(outer, [("requests", vec![Value::from(one), Value::from(two)])]).unwrap();
        assert_eq!(msg.encode().unwrap(), b"\x0A\x09\x0A\x07testing\x0A\x06\x0A\x04test");
    }

    #[test]
    fn embedded_schema_same_name() {
        let inner = MessageSchema::builder("Request")
            .optional(FieldType::String, "name", 1)
            .build()
            .unwrap();
        let impostor = MessageSchema::builder("Request")
            .optional(FieldType::Int32, "name", 1)
            .build()
            .unwrap();
        let outer = MessageSchema::builder("Envelope")
            .required(inner.clone(), "request", 1)
            .build()
            .unwrap();

        let msg = DynamicMessage::with_values(outer.clone(), [("request", DynamicMessage::new(impostor))]).unwrap();
        assert_eq!(
            msg.encode(),
            Err(EncodeError::TypeMismatch {
                field: "request".into(),
                expected: "embedded message"
            })
        );

        // An equal schema built separately is accepted.
        let rebuilt = MessageSchema::builder("Request")
            .optional(FieldType::String, "name", 1)
            .build()
            .unwrap();
        assert!(!Arc::ptr_eq(&inner, &rebuilt));
        let msg = DynamicMessage::with_values(outer, [("request", DynamicMessage::new(rebuilt))]).unwrap();
        assert_eq!(msg.encode().unwrap(), b"\x0A\x00");
    }

    #[test]
    fn embedded_schema_mismatch() {
        let inner = MessageSchema::builder("Request").build().unwrap();
        let other = MessageSchema::builder("Other").build().unwrap();
        let outer = MessageSchema::builder("Envelope")
            .required(inner, "request", 1)
            .build()
            .unwrap();
        let msg = DynamicMessage::with_values(outer, [("request", DynamicMessage::new(other))]).unwrap();
        assert_eq!(
            msg.encode(),
            Err(EncodeError::TypeMismatch {
                field: "request".into(),
                expected: "embedded message"
            })
        );
    }

    #[test]
    fn defaults() {
        let schema = MessageSchema::builder("Request")
            .required_with(FieldType::String, "name", 1, FieldOptions::new().with_default("testing"))
            .optional(FieldType::Int32, "count", 2)
            .build()
            .unwrap();
        let msg = DynamicMessage::new(schema.clone());
        assert_eq!(msg.get("name").and_then(Value::as_str), Some("testing"));
        assert_eq!(msg.get("count"), None);
        assert!(!msg.is_set("name"));
        assert_eq!(msg.encode().unwrap(), b"\x0A\x07testing");

        let decoded = DynamicMessage::decode(schema, b"\x10\x05").unwrap();
        assert_eq!(decoded.get("name").and_then(Value::as_str), Some("testing"));
        assert_eq!(decoded.get("count"), Some(&Value::Int(5)));
    }

    #[test]
    fn missing_required() {
        let msg = DynamicMessage::new(request());
        assert_eq!(msg.encode(), Err(EncodeError::MissingRequired { field: "name".into() }));
        assert_eq!(
            DynamicMessage::decode(request(), &[]),
            Err(DecodeError::MissingRequired { field: "name".into() })
        );
    }

    #[test]
    fn idempotent() {
        let schema = MessageSchema::builder("Request")
            .required(FieldType::String, "name", 1)
            .repeated_with(FieldType::Int32, "ids", 2, FieldOptions::new().packed())
            .optional(FieldType::Double, "ratio", 3)
            .build()
            .unwrap();
        let msg = DynamicMessage::with_values(
            schema,
            [("name", Value::from("x")), ("ids", Value::from([1, 2, 3])), ("ratio", Value::from(0.5))],
        )
        .unwrap();
        assert_eq!(msg.encode().unwrap(), msg.encode().unwrap());
    }

    #[test]
    fn failed_encode_leaves_buffer() {
        let schema = MessageSchema::builder("Request")
            .required(FieldType::String, "name", 1)
            .required(FieldType::Int32, "count", 2)
            .build()
            .unwrap();
        let msg = DynamicMessage::with_values(schema, [("name", Value::from("x")), ("count", Value::Int(1 << 33))]).unwrap();

        let mut buf = ByteBuffer::new();
        buf.write_varint(1);
        assert!(matches!(msg.encode_into(&mut buf), Err(EncodeError::Range { .. })));
        assert_eq!(buf.bytes(), [0x01]);
    }

    #[test]
    fn depth_limit() {
        let leaf = MessageSchema::builder("Leaf").build().unwrap();
        let mid = MessageSchema::builder("Mid").optional(leaf.clone(), "leaf", 1).build().unwrap();
        let top = MessageSchema::builder("Top").optional(mid.clone(), "mid", 1).build().unwrap();

        let mid_msg = DynamicMessage::with_values(mid, [("leaf", DynamicMessage::new(leaf))]).unwrap();
        let msg = DynamicMessage::with_values(top.clone(), [("mid", mid_msg)]).unwrap();

        let mut buf = ByteBuffer::new();
        msg.encode_with(&mut buf, &Limits::new(2)).unwrap();
        assert_eq!(buf, b"\x0A\x02\x0A\x00");
        assert_eq!(
            msg.encode_with(&mut ByteBuffer::new(), &Limits::new(1)),
            Err(EncodeError::DepthExceeded { limit: 1 })
        );
        assert_eq!(
            DynamicMessage::decode_with(top, buf.bytes(), &Limits::new(1)),
            Err(DecodeError::DepthExceeded { limit: 1 })
        );
    }

    #[test]
    fn decode_repeated_accepts_both_forms() {
        let schema = MessageSchema::builder("Request")
            .repeated(FieldType::Int32, "ids", 1)
            .build()
            .unwrap();
        // Unpacked 1, packed [2, 3], unpacked 4.
        let msg = DynamicMessage::decode(schema, b"\x08\x01\x0A\x02\x02\x03\x08\x04").unwrap();
        assert_eq!(msg.get("ids"), Some(&Value::from([1, 2, 3, 4])));
    }

    #[test]
    fn decode_skips_unknown_and_last_wins() {
        let schema = MessageSchema::builder("Request")
            .optional(FieldType::Uint32, "count", 1)
            .build()
            .unwrap();
        let msg = DynamicMessage::decode(schema, b"\x08\x01\x12\x02hi\x1D\x00\x00\x00\x00\x08\x02").unwrap();
        assert_eq!(msg.get("count"), Some(&Value::Int(2)));
    }

    #[test]
    fn decode_wire_type_mismatch() {
        let res = DynamicMessage::decode(request(), b"\x08\x01");
        assert_eq!(
            res,
            Err(DecodeError::WireTypeMismatch {
                field: "name".into(),
                expected: WireType::LengthDelimited,
                actual: WireType::Varint
            })
        );
    }

    #[test]
    fn decode_truncated() {
        assert!(matches!(
            DynamicMessage::decode(request(), b"\x0A\x07test"),
            Err(DecodeError::Underflow { .. })
        ));
    }
}
