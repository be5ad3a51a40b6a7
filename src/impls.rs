use alloc::string::String;
use alloc::vec::Vec;

use crate::range::{validate_float, validate_int32, validate_int64, validate_uint32, validate_uint64};
use crate::{DecodeError, EncodeError, FieldValue, RepeatedValue, Value};

fn unexpected(expected: &'static str) -> DecodeError {
    DecodeError::UnexpectedValue { expected }
}

impl FieldValue for bool {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Bool(*self))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| unexpected("bool"))
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int(*self as i128))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let v = value.as_int().ok_or_else(|| unexpected("integer"))?;
        Ok(validate_int32(v)?)
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int(*self as i128))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let v = value.as_int().ok_or_else(|| unexpected("integer"))?;
        Ok(validate_int64(v)?)
    }
}

impl FieldValue for u32 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int(*self as i128))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let v = value.as_int().ok_or_else(|| unexpected("integer"))?;
        Ok(validate_uint32(v)?)
    }
}

impl FieldValue for u64 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Int(*self as i128))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let v = value.as_int().ok_or_else(|| unexpected("integer"))?;
        Ok(validate_uint64(v)?)
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Float(*self))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let v = value.as_f64().ok_or_else(|| unexpected("float"))?;
        Ok(validate_float(v)?)
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Double(*self))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        value.as_f64().ok_or_else(|| unexpected("double"))
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::String(self.clone()))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        value.as_str().map(String::from).ok_or_else(|| unexpected("string"))
    }
}

impl FieldValue for Vec<u8> {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Bytes(self.clone()))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        value.as_bytes().map(<[u8]>::to_vec).ok_or_else(|| unexpected("bytes"))
    }
}

impl<const N: usize> FieldValue for heapless::String<N> {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::String(self.as_str().into()))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let data = value.as_str().ok_or_else(|| unexpected("string"))?;
        let mut s = heapless::String::new();
        s.push_str(data)
            .map_err(|_| DecodeError::CapacityExceeded { capacity: N })?;
        Ok(s)
    }
}

impl<const N: usize> FieldValue for heapless::Vec<u8, N> {
    fn to_value(&self) -> Result<Value, EncodeError> {
        Ok(Value::Bytes(self.to_vec()))
    }
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let data = value.as_bytes().ok_or_else(|| unexpected("bytes"))?;
        heapless::Vec::from_slice(data).map_err(|_| DecodeError::CapacityExceeded { capacity: N })
    }
}

impl<const N: usize> From<heapless::String<N>> for Value {
    fn from(val: heapless::String<N>) -> Self {
        Value::String(val.as_str().into())
    }
}

impl<const N: usize> From<heapless::Vec<u8, N>> for Value {
    fn from(val: heapless::Vec<u8, N>) -> Self {
        Value::Bytes(val.to_vec())
    }
}

impl<T: FieldValue> RepeatedValue for Vec<T> {
    type Item = T;

    fn try_push(&mut self, item: T) -> Result<(), DecodeError> {
        self.push(item);
        Ok(())
    }
}

impl<T: FieldValue, const N: usize> RepeatedValue for heapless::Vec<T, N> {
    type Item = T;

    fn try_push(&mut self, item: T) -> Result<(), DecodeError> {
        self.push(item).map_err(|_| DecodeError::CapacityExceeded { capacity: N })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RangeError;

    #[test]
    fn integers() {
        assert_eq!(7i32.to_value(), Ok(Value::Int(7)));
        assert_eq!(i32::from_value(&Value::Int(-7)), Ok(-7));
        assert_eq!(
            i32::from_value(&Value::Int(1 << 31)),
            Err(DecodeError::Range(RangeError::Int32(1 << 31)))
        );
        assert_eq!(u64::from_value(&Value::Int(u64::MAX as i128)), Ok(u64::MAX));
        assert_eq!(u32::from_value(&Value::Int(-1)), Err(DecodeError::Range(RangeError::Uint32(-1))));
        assert_eq!(
            i64::from_value(&Value::Bool(true)),
            Err(DecodeError::UnexpectedValue { expected: "integer" })
        );
    }

    #[test]
    fn heapless_string() {
        let s: heapless::String<8> = heapless::String::try_from("testing").unwrap();
        assert_eq!(s.to_value(), Ok(Value::String("testing".into())));
        assert_eq!(Value::from(s.clone()), Value::String("testing".into()));
        assert_eq!(heapless::String::<8>::from_value(&Value::from("testing")), Ok(s));
        assert_eq!(
            heapless::String::<4>::from_value(&Value::from("testing")),
            Err(DecodeError::CapacityExceeded { capacity: 4 })
        );
    }

    #[test]
    fn heapless_bytes() {
        let v = heapless::Vec::<u8, 4>::from_slice(&[1, 2]).unwrap();
        assert_eq!(v.to_value(), Ok(Value::Bytes(alloc::vec![1, 2])));
        assert_eq!(heapless::Vec::<u8, 4>::from_value(&Value::Bytes(alloc::vec![1, 2])), Ok(v));
        assert!(heapless::Vec::<u8, 1>::from_value(&Value::Bytes(alloc::vec![1, 2])).is_err());
    }

    #[test]
    fn repeated_capacity() {
        let values = [Value::Int(1), Value::Int(2), Value::Int(3)];
        assert_eq!(Vec::<u32>::from_values(&values), Ok(alloc::vec![1, 2, 3]));
        assert_eq!(
            heapless::Vec::<u32, 3>::from_values(&values).map(|v| v.to_vec()),
            Ok(alloc::vec![1, 2, 3])
        );
        assert_eq!(
            heapless::Vec::<u32, 2>::from_values(&values),
            Err(DecodeError::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(
            Vec::<u32>::from_values(&[Value::Int(-1)]),
            Err(DecodeError::Range(RangeError::Uint32(-1)))
        );
    }
}
