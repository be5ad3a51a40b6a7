use crate::buffer::{zigzag_decode32, zigzag_decode64};
use crate::wire::split_key;
use crate::{DecodeError, RangeError, WireType};

/// Longest valid varint encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Cursor over a borrowed byte slice. Reads consume from the front.
///
/// A failed read leaves the cursor where it was.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Create a new [`ByteReader`] over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The bytes not consumed yet.
    pub fn inner(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    /// Whether every byte has been consumed.
    pub fn eof(&self) -> bool {
        self.data.is_empty()
    }

    fn underflow(&self, needed: usize) -> DecodeError {
        DecodeError::Underflow {
            needed,
            remaining: self.data.len(),
        }
    }

    /// Read exactly `N` bytes.
    pub fn read<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(u8::from_le_bytes(self.read()?))
    }
    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read()?))
    }
    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read()?))
    }
    pub fn read_sfixed32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read()?))
    }
    pub fn read_sfixed64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read()?))
    }
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read()?))
    }
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read()?))
    }

    /// Read `len` raw bytes.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let res = self.data.get(..len).ok_or_else(|| self.underflow(len))?;
        self.data = &self.data[len..];
        Ok(res)
    }

    /// Read everything that is left.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let res = self.data;
        self.data = &[];
        res
    }

    /// Read the raw bytes of one varint, continuation bits included.
    pub fn read_varint_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        match self.data.iter().position(|b| b & 0x80 == 0) {
            Some(i) if i < MAX_VARINT_LEN => self.read_slice(i + 1),
            Some(_) => Err(DecodeError::VarintOverflow),
            None if self.data.len() >= MAX_VARINT_LEN => Err(DecodeError::VarintOverflow),
            None => Err(self.underflow(self.data.len() + 1)),
        }
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.data;
        let bytes = self.read_varint_bytes()?;
        let mut res = 0;
        for (i, x) in bytes.iter().enumerate() {
            // The tenth group only has room for the top bit.
            if i == MAX_VARINT_LEN - 1 && *x > 1 {
                self.data = start;
                return Err(DecodeError::VarintOverflow);
            }
            res |= (*x as u64 & 0x7F) << (7 * i);
        }
        Ok(res)
    }

    /// Read a varint holding a two's-complement signed value.
    pub fn read_signed_varint(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_varint()? as i64)
    }

    pub fn read_zigzag32(&mut self) -> Result<i32, DecodeError> {
        let start = self.data;
        let u = self.read_varint()?;
        match u32::try_from(u) {
            Ok(u) => Ok(zigzag_decode32(u)),
            Err(_) => {
                self.data = start;
                Err(RangeError::Uint32(u as i128).into())
            }
        }
    }

    pub fn read_zigzag64(&mut self) -> Result<i64, DecodeError> {
        Ok(zigzag_decode64(self.read_varint()?))
    }

    /// Any nonzero varint reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_varint()? != 0)
    }

    /// Read a varint length followed by that many raw bytes.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.data;
        let len = self.read_varint()?;
        let res = usize::try_from(len)
            .map_err(|_| DecodeError::Underflow {
                needed: usize::MAX,
                remaining: self.data.len(),
            })
            .and_then(|len| self.read_slice(len));
        if res.is_err() {
            self.data = start;
        }
        res
    }

    /// Read a field key.
    pub fn read_key(&mut self) -> Result<(u32, WireType), DecodeError> {
        let start = self.data;
        let res = split_key(self.read_varint()?);
        if res.is_err() {
            self.data = start;
        }
        res
    }

    /// Iterate over the remaining data as a sequence of fields.
    pub fn read_fields(&mut self) -> FieldIter<'_, 'a> {
        FieldIter { r: self, done: false }
    }
}

/// Iterator over the fields of an encoded message, see [`ByteReader::read_fields`].
#[derive(Debug)]
pub struct FieldIter<'a, 'b> {
    r: &'a mut ByteReader<'b>,
    done: bool,
}

impl<'a, 'b> FieldIter<'a, 'b> {
    fn next_field(&mut self) -> Result<RawField<'b>, DecodeError> {
        let (number, wire_type) = self.r.read_key()?;
        let payload = match wire_type {
            WireType::Varint => self.r.read_varint_bytes()?,
            WireType::SixtyFourBit => self.r.read_slice(8)?,
            WireType::LengthDelimited => self.r.read_length_delimited()?,
            WireType::ThirtyTwoBit => self.r.read_slice(4)?,
        };
        Ok(RawField {
            number,
            wire_type,
            payload,
        })
    }
}

impl<'a, 'b> Iterator for FieldIter<'a, 'b> {
    type Item = Result<RawField<'b>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.r.eof() {
            return None;
        }
        let res = self.next_field();
        self.done = res.is_err();
        Some(res)
    }
}

/// One key/value record of an encoded message.
///
/// `payload` excludes the key and, for length-delimited fields, the length prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawField<'a> {
    pub number: u32,
    pub wire_type: WireType,
    pub payload: &'a [u8],
}

impl<'a> RawField<'a> {
    /// A reader over the payload.
    pub fn reader(&self) -> ByteReader<'a> {
        ByteReader::new(self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_multi_byte() {
        let mut r = ByteReader::new(&[0x96, 0x01, 0xFF]);
        assert_eq!(r.read_varint(), Ok(150));
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn varint_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(ByteReader::new(&data).read_varint(), Ok(u64::MAX));
    }

    #[test]
    fn varint_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(ByteReader::new(&data).read_varint(), Err(DecodeError::VarintOverflow));
        let data = [0x80; 11];
        assert_eq!(ByteReader::new(&data).read_varint(), Err(DecodeError::VarintOverflow));
    }

    #[test]
    fn truncated_varint_leaves_cursor() {
        let mut r = ByteReader::new(&[0x96]);
        assert_eq!(
            r.read_varint(),
            Err(DecodeError::Underflow {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn bool_nonzero_is_true() {
        let mut r = ByteReader::new(&[0x00, 0x01, 0x02, 0x96, 0x01]);
        assert_eq!(r.read_bool(), Ok(false));
        assert_eq!(r.read_bool(), Ok(true));
        assert_eq!(r.read_bool(), Ok(true));
        assert_eq!(r.read_bool(), Ok(true));
        assert!(r.eof());
    }

    #[test]
    fn length_delimited_underflow_leaves_cursor() {
        let mut r = ByteReader::new(&[0x05, b'a', b'b']);
        assert!(matches!(r.read_length_delimited(), Err(DecodeError::Underflow { .. })));
        assert_eq!(r.remaining(), 3);
    }

    #[test]
    fn fields() {
        // 1: varint 150, 2: "hi", 3: fixed32 1, 4: fixed64 2
        let data = [
            0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i', 0x1D, 0x01, 0x00, 0x00, 0x00, 0x21, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        let mut r = ByteReader::new(&data);
        let fields = r.read_fields().collect::<Result<alloc::vec::Vec<_>, _>>().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].number, 1);
        assert_eq!(fields[0].payload, &[0x96, 0x01]);
        assert_eq!(fields[1].wire_type, WireType::LengthDelimited);
        assert_eq!(fields[1].payload, b"hi");
        assert_eq!(fields[2].reader().read_fixed32(), Ok(1));
        assert_eq!(fields[3].reader().read_fixed64(), Ok(2));
    }

    #[test]
    fn fields_stop_after_error() {
        let data = [0x0B, 0x00, 0x08, 0x01];
        let mut r = ByteReader::new(&data);
        let mut fields = r.read_fields();
        assert_eq!(fields.next(), Some(Err(DecodeError::InvalidWireType(3))));
        assert_eq!(fields.next(), None);
    }
}
