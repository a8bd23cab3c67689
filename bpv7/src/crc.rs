//! CRC computation and the blank-then-compute placeholder pattern used to
//! verify and regenerate the CRC value carried by a block.

use crate::error::Error;
use bp7_cbor::encode::Encoder;
use bp7_cbor::{decode, encode};

const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);
const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

/// The CRC type a block carries, as encoded in its third primary/canonical
/// block field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcType {
    #[default]
    None,
    Crc16,
    Crc32,
}

impl TryFrom<u64> for CrcType {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CrcType::None),
            1 => Ok(CrcType::Crc16),
            2 => Ok(CrcType::Crc32),
            v => Err(Error::Unsupported(format!("crc type {v}"))),
        }
    }
}

impl From<CrcType> for u64 {
    fn from(value: CrcType) -> Self {
        match value {
            CrcType::None => 0,
            CrcType::Crc16 => 1,
            CrcType::Crc32 => 2,
        }
    }
}

impl encode::ToCbor for CrcType {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit(&u64::from(*self))
    }
}

impl decode::FromCbor for CrcType {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        let (v, shortest, len) =
            <u64 as decode::FromCbor>::from_cbor(data).map_err(Error::InvalidCBOR)?;
        Ok((CrcType::try_from(v)?, shortest, len))
    }
}

/// Computes the CRC-16/CCITT-FALSE value of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Computes the CRC-32/Castagnoli value of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Appends a placeholder CRC value of the right width for `crc_type`, so the
/// caller can serialize the rest of the block before coming back to fill in
/// the real checksum.
pub fn placeholder(crc_type: CrcType) -> Vec<u8> {
    match crc_type {
        CrcType::None => Vec::new(),
        CrcType::Crc16 => vec![0u8; 2],
        CrcType::Crc32 => vec![0u8; 4],
    }
}

/// Computes and writes the CRC for a fully-serialized block, given the byte
/// range within `data` that holds the (currently zeroed) CRC field.
pub fn append(crc_type: CrcType, data: &mut [u8], crc_range: std::ops::Range<usize>) {
    match crc_type {
        CrcType::None => {}
        CrcType::Crc16 => {
            let v = crc16(data);
            data[crc_range].copy_from_slice(&v.to_be_bytes());
        }
        CrcType::Crc32 => {
            let v = crc32(data);
            data[crc_range].copy_from_slice(&v.to_be_bytes());
        }
    }
}

/// Verifies the CRC for a fully-serialized block by blanking out the CRC
/// field, recomputing over the rest, and comparing to the stored value.
pub fn check(crc_type: CrcType, data: &[u8], crc_range: std::ops::Range<usize>, stored: &[u8]) -> bool {
    match crc_type {
        CrcType::None => true,
        CrcType::Crc16 => {
            let mut scratch = data.to_vec();
            scratch[crc_range].fill(0);
            let expected = crc16(&scratch).to_be_bytes();
            expected == stored
        }
        CrcType::Crc32 => {
            let mut scratch = data.to_vec();
            scratch[crc_range].fill(0);
            let expected = crc32(&scratch).to_be_bytes();
            expected == stored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_ccitt_false_known_vector() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn crc32_castagnoli_known_vector() {
        assert_eq!(crc32(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn crc_type_round_trips_through_cbor() {
        for t in [CrcType::None, CrcType::Crc16, CrcType::Crc32] {
            assert_eq!(u64::from(t), u64::from(CrcType::try_from(u64::from(t)).unwrap()));
        }
    }
}
