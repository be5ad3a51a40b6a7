//! Wire types and field keys.

use crate::DecodeError;

/// Largest field number a key can carry.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Wire type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Varint: int32, int64, uint32, uint64, sint32, sint64, bool, enum.
    Varint = 0,
    /// 64-bit: fixed64, sfixed64, double.
    SixtyFourBit = 1,
    /// Length-delimited: string, bytes, embedded messages, packed repeated fields.
    LengthDelimited = 2,
    //StartGroup = 3,
    //EndGroup = 4,
    /// 32-bit: fixed32, sfixed32, float.
    ThirtyTwoBit = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFourBit),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::ThirtyTwoBit),
            x => Err(DecodeError::InvalidWireType(x)),
        }
    }
}

/// Compute the key written before a field: `(number << 3) | wire_type`.
pub const fn key(number: u32, wire_type: WireType) -> u64 {
    ((number as u64) << 3) | wire_type as u64
}

/// Split a key into its field number and wire type.
pub fn split_key(key: u64) -> Result<(u32, WireType), DecodeError> {
    let wire_type = WireType::try_from((key & 0b111) as u8)?;
    let number = key >> 3;
    if number == 0 || number > MAX_FIELD_NUMBER as u64 {
        return Err(DecodeError::InvalidFieldNumber(number));
    }
    Ok((number as u32, wire_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_field_one() {
        assert_eq!(key(1, WireType::Varint), 0x08);
        assert_eq!(key(1, WireType::SixtyFourBit), 0x09);
        assert_eq!(key(1, WireType::LengthDelimited), 0x0A);
        assert_eq!(key(1, WireType::ThirtyTwoBit), 0x0D);
    }

    #[test]
    fn key_for_large_number() {
        assert_eq!(key(MAX_FIELD_NUMBER, WireType::ThirtyTwoBit), ((MAX_FIELD_NUMBER as u64) << 3) | 5);
        assert_eq!(split_key(key(MAX_FIELD_NUMBER, WireType::Varint)), Ok((MAX_FIELD_NUMBER, WireType::Varint)));
    }

    #[test]
    fn split_rejects_group_types() {
        assert_eq!(split_key(0x0B), Err(DecodeError::InvalidWireType(3)));
        assert_eq!(split_key(0x0C), Err(DecodeError::InvalidWireType(4)));
    }

    #[test]
    fn split_rejects_field_zero() {
        assert_eq!(split_key(0x02), Err(DecodeError::InvalidFieldNumber(0)));
    }
}
