//! Canonical (non-primary) blocks: the payload block and the standard
//! extension blocks this stack understands.

use crate::block_flags::BlockFlags;
use crate::cbor_support::parse_array;
use crate::crc::{self, CrcType};
use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

/// The canonical block type code (RFC 9171 §4.3, plus the private-use
/// previous-node/bundle-age/hop-count extension blocks defined alongside it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Payload,
    PreviousNode,
    BundleAge,
    HopCount,
    Unrecognised(u64),
}

impl From<u64> for Type {
    fn from(v: u64) -> Self {
        match v {
            1 => Type::Payload,
            6 => Type::PreviousNode,
            7 => Type::BundleAge,
            10 => Type::HopCount,
            v => Type::Unrecognised(v),
        }
    }
}

impl From<Type> for u64 {
    fn from(t: Type) -> Self {
        match t {
            Type::Payload => 1,
            Type::PreviousNode => 6,
            Type::BundleAge => 7,
            Type::HopCount => 10,
            Type::Unrecognised(v) => v,
        }
    }
}

impl Type {
    /// A block type that RFC 9171 requires to be unique within a bundle.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Type::Payload | Type::PreviousNode | Type::BundleAge | Type::HopCount)
    }
}

/// A canonical block: the payload or an extension block, carried verbatim
/// (as owned bytes) alongside its parsed header fields.
#[derive(Debug, Clone)]
pub struct Block {
    pub block_type: Type,
    pub block_number: u64,
    pub flags: BlockFlags,
    pub crc_type: CrcType,
    pub data: Vec<u8>,
    /// The CRC bytes as received on the wire, kept only so [`Block::crc_ok`]
    /// can compare against a freshly computed value. `None` for blocks built
    /// locally with [`Block::new`]; `emit` always (re)computes the CRC.
    received_crc: Option<Vec<u8>>,
}

impl Block {
    pub fn new(block_type: Type, block_number: u64, flags: BlockFlags, crc_type: CrcType, data: Vec<u8>) -> Self {
        Self {
            block_type,
            block_number,
            flags,
            crc_type,
            data,
            received_crc: None,
        }
    }

    /// Checks the CRC received on the wire against the one this block's
    /// content would canonically produce. Blocks without a recorded CRC
    /// (built locally, or with `crc_type == None`) are always considered ok.
    pub fn crc_ok(&self) -> bool {
        match self.crc_type {
            CrcType::None => true,
            _ => match &self.received_crc {
                None => false,
                Some(received) => {
                    let mut scratch = self.clone();
                    scratch.received_crc = None;
                    scratch.emit().ends_with(received)
                }
            },
        }
    }

    /// Serializes this block as a standalone canonical-block CBOR array:
    /// `[type, number, flags, crc_type, data (, crc)]`.
    pub fn emit(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        let mut crc_range = 0..0;
        encoder.emit_array(Some(if matches!(self.crc_type, CrcType::None) { 5 } else { 6 }), |a| {
            a.emit(&u64::from(self.block_type));
            a.emit(&self.block_number);
            a.emit(&self.flags);
            a.emit(&self.crc_type);
            a.emit(&encode::Bytes(&self.data));
            if !matches!(self.crc_type, CrcType::None) {
                let placeholder = crc::placeholder(self.crc_type);
                crc_range = a.emit(&encode::Bytes(&placeholder));
            }
        });
        let mut bytes = encoder.build();
        if !matches!(self.crc_type, CrcType::None) {
            crc::append(self.crc_type, &mut bytes, crc_range);
        }
        bytes
    }
}

impl decode::FromCbor for Block {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let block_type = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let block_number = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let flags = a.parse::<BlockFlags>()?;
            let crc_type = a.parse::<CrcType>()?;
            let payload: Vec<u8> = a
                .parse::<Box<[u8]>>()
                .map_err(Error::InvalidCBOR)?
                .into_vec();
            let received_crc = if matches!(crc_type, CrcType::None) {
                None
            } else {
                let crc: Box<[u8]> = a.parse().map_err(Error::InvalidCBOR)?;
                Some(crc.into_vec())
            };
            Ok(Self {
                block_type: Type::from(block_type),
                block_number,
                flags,
                crc_type,
                data: payload,
                received_crc,
            })
        })
    }
}
