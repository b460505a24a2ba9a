//! Sequential reader over protobuf wire bytes.
//!
//! This is the minimal surface needed to scan option extension blobs: read a
//! (field number, wire type) tag, read varint-backed int32/bool values, read a
//! length-delimited payload, and skip anything else by wire type. It is not a
//! message codec.

use thiserror::Error;

/// Wire type of a tagged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    Len,
    StartGroup,
    EndGroup,
    Fixed32,
}

impl WireType {
    fn from_tag_bits(bits: u32) -> Option<WireType> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::Len),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of buffer at offset {0}")]
    UnexpectedEof(usize),
    #[error("varint longer than 10 bytes at offset {0}")]
    VarintOverflow(usize),
    #[error("invalid wire type {wire_type} at offset {offset}")]
    InvalidWireType { wire_type: u32, offset: usize },
    #[error("field number 0 at offset {0}")]
    ZeroFieldNumber(usize),
    #[error("field number out of range at offset {0}")]
    FieldNumberOutOfRange(usize),
    #[error("end-group tag without matching start at offset {0}")]
    UnexpectedEndGroup(usize),
}

/// Cursor over a byte slice. All reads advance the position; errors leave the
/// position wherever the failed read stopped.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(WireError::UnexpectedEof(self.pos))?;
            self.pos += 1;
            if shift < 64 {
                value |= u64::from(byte & 0x7f) << shift;
            }
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 70 {
                return Err(WireError::VarintOverflow(start));
            }
        }
    }

    /// Read a (field number, wire type) tag.
    pub fn read_tag(&mut self) -> Result<(u32, WireType), WireError> {
        let start = self.pos;
        let raw = self.read_varint()?;
        let wire_type = WireType::from_tag_bits((raw & 0x7) as u32).ok_or(
            WireError::InvalidWireType {
                wire_type: (raw & 0x7) as u32,
                offset: start,
            },
        )?;
        let number = u32::try_from(raw >> 3)
            .map_err(|_| WireError::FieldNumberOutOfRange(start))?;
        if number == 0 {
            return Err(WireError::ZeroFieldNumber(start));
        }
        Ok((number, wire_type))
    }

    /// Varint decoded as protobuf `int32` (low 32 bits, sign-extended).
    pub fn read_int32(&mut self) -> Result<i32, WireError> {
        Ok(self.read_varint()? as i32)
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_varint()? != 0)
    }

    /// Length prefix of a length-delimited value.
    pub fn read_len_prefix(&mut self) -> Result<usize, WireError> {
        let start = self.pos;
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| WireError::FieldNumberOutOfRange(start))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(WireError::UnexpectedEof(self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Skip one value of the given wire type without interpreting it.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), WireError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.read_bytes(8)?;
            }
            WireType::Fixed32 => {
                self.read_bytes(4)?;
            }
            WireType::Len => {
                let len = self.read_len_prefix()?;
                self.read_bytes(len)?;
            }
            WireType::StartGroup => self.skip_group()?,
            WireType::EndGroup => return Err(WireError::UnexpectedEndGroup(self.pos)),
        }
        Ok(())
    }

    fn skip_group(&mut self) -> Result<(), WireError> {
        loop {
            let (_, wire_type) = self.read_tag()?;
            if wire_type == WireType::EndGroup {
                return Ok(());
            }
            self.skip(wire_type)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_single_and_multi_byte() {
        let mut r = WireReader::new(&[0x05, 0xac, 0x02]);
        assert_eq!(r.read_varint().unwrap(), 5);
        assert_eq!(r.read_varint().unwrap(), 300);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn varint_max_and_overflow() {
        let max = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut r = WireReader::new(&max);
        assert_eq!(r.read_varint().unwrap(), u64::MAX);

        let over = [0xff; 11];
        let mut r = WireReader::new(&over);
        assert!(matches!(r.read_varint(), Err(WireError::VarintOverflow(0))));
    }

    #[test]
    fn varint_truncated() {
        let mut r = WireReader::new(&[0x80]);
        assert!(matches!(r.read_varint(), Err(WireError::UnexpectedEof(1))));
    }

    #[test]
    fn tag_decodes_number_and_type() {
        // field 25, varint: (25 << 3) | 0 = 200
        let mut r = WireReader::new(&[0xc8, 0x01]);
        assert_eq!(r.read_tag().unwrap(), (25, WireType::Varint));
    }

    #[test]
    fn tag_rejects_field_number_zero() {
        let mut r = WireReader::new(&[0x00]);
        assert!(matches!(r.read_tag(), Err(WireError::ZeroFieldNumber(0))));
    }

    #[test]
    fn int32_sign_extends() {
        // -1 as int32 is encoded as 10-byte varint
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_int32().unwrap(), -1);
    }

    #[test]
    fn skip_each_wire_type() {
        let mut r = WireReader::new(&[0xac, 0x02]);
        r.skip(WireType::Varint).unwrap();
        assert_eq!(r.remaining(), 0);

        let mut r = WireReader::new(&[0; 8]);
        r.skip(WireType::Fixed64).unwrap();
        assert_eq!(r.remaining(), 0);

        let mut r = WireReader::new(&[0; 4]);
        r.skip(WireType::Fixed32).unwrap();
        assert_eq!(r.remaining(), 0);

        let mut r = WireReader::new(&[0x03, 1, 2, 3, 9]);
        r.skip(WireType::Len).unwrap();
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn skip_nested_group() {
        // start group 1, start group 2, varint field 3 = 7, end group 2, end group 1
        let bytes = [0x0b, 0x13, 0x18, 0x07, 0x14, 0x0c];
        let mut r = WireReader::new(&bytes);
        let (number, wire_type) = r.read_tag().unwrap();
        assert_eq!(number, 1);
        r.skip(wire_type).unwrap();
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn skip_truncated_len_fails() {
        let mut r = WireReader::new(&[0x05, 1, 2]);
        assert!(r.skip(WireType::Len).is_err());
    }
}
