//! Range validation for numeric field values.
//!
//! Each validator checks a value against the representable domain of a protobuf scalar type and
//! returns it narrowed to the matching Rust type. Validation runs before any byte of the field is
//! written.

use crate::RangeError;

pub fn validate_int32(value: i128) -> Result<i32, RangeError> {
    i32::try_from(value).map_err(|_| RangeError::Int32(value))
}

pub fn validate_int64(value: i128) -> Result<i64, RangeError> {
    i64::try_from(value).map_err(|_| RangeError::Int64(value))
}

pub fn validate_uint32(value: i128) -> Result<u32, RangeError> {
    u32::try_from(value).map_err(|_| RangeError::Uint32(value))
}

pub fn validate_uint64(value: i128) -> Result<u64, RangeError> {
    u64::try_from(value).map_err(|_| RangeError::Uint64(value))
}

/// Narrow to `f32`, rejecting finite values that would overflow to infinity.
pub fn validate_float(value: f64) -> Result<f32, RangeError> {
    let narrow = value as f32;
    if value.is_finite() && narrow.is_infinite() {
        return Err(RangeError::Float(value.to_bits()));
    }
    Ok(narrow)
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn int32_bounds() {
        assert_eq!(validate_int32(i32::MIN as i128), Ok(i32::MIN));
        assert_eq!(validate_int32(i32::MAX as i128), Ok(i32::MAX));
        assert_eq!(validate_int32(i32::MAX as i128 + 1), Err(RangeError::Int32(2147483648)));
        assert_eq!(validate_int32(i32::MIN as i128 - 1), Err(RangeError::Int32(-2147483649)));
    }

    #[test]
    fn int64_bounds() {
        assert_eq!(validate_int64(i64::MIN as i128), Ok(i64::MIN));
        assert_eq!(validate_int64(i64::MAX as i128), Ok(i64::MAX));
        assert!(validate_int64(i64::MAX as i128 + 1).is_err());
        assert!(validate_int64(i64::MIN as i128 - 1).is_err());
    }

    #[test]
    fn unsigned_rejects_negative() {
        assert_eq!(validate_uint32(-1), Err(RangeError::Uint32(-1)));
        assert_eq!(validate_uint64(-1), Err(RangeError::Uint64(-1)));
        assert_eq!(validate_uint32(u32::MAX as i128), Ok(u32::MAX));
        assert!(validate_uint32(u32::MAX as i128 + 1).is_err());
        assert_eq!(validate_uint64(u64::MAX as i128), Ok(u64::MAX));
        assert!(validate_uint64(u64::MAX as i128 + 1).is_err());
    }

    #[test]
    fn message() {
        assert_eq!(
            RangeError::Int32(2147483648).to_string(),
            "2147483648 is not a valid 32 bit integer. The value must be between -2147483648 and 2147483647."
        );
    }

    #[test]
    fn float_bounds() {
        assert_eq!(validate_float(1.5), Ok(1.5));
        assert_eq!(validate_float(f32::MAX as f64), Ok(f32::MAX));
        assert_eq!(validate_float(f64::INFINITY), Ok(f32::INFINITY));
        assert!(validate_float(f64::NAN).is_ok_and(f32::is_nan));
        assert_eq!(validate_float(1e300), Err(RangeError::Float(1e300f64.to_bits())));
        assert_eq!(validate_float(-1e300), Err(RangeError::Float((-1e300f64).to_bits())));
        assert_eq!(
            RangeError::Float(1e300f64.to_bits()).to_string(),
            format!("{} is not a valid 32 bit float. The magnitude must not exceed {}.", 1e300f64, f32::MAX)
        );
    }
}
