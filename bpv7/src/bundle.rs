//! The assembled bundle: a primary block plus an ordered sequence of
//! canonical blocks, with the invariants RFC 9171 requires of that sequence.

use crate::block::{Block, Type as BlockType};
use crate::bundle_id::BundleId;
use crate::error::Error;
use bp7_cbor::decode::{self, Value};
use bp7_cbor::encode::{self, Encoder};

pub use crate::primary_block::PrimaryBlock;

/// A fully parsed or fully built bundle.
///
/// Invariants upheld by every `Bundle` in this module (checked at
/// construction and at decode time):
/// - I1: there is exactly one payload block, numbered 1.
/// - I2: the payload block is the last block in the sequence.
/// - I3: block numbers are unique within the bundle.
/// - I4: the primary block is implicitly numbered 0 and is never repeated
///   among the extension blocks.
/// - I5: singleton extension block types (previous-node, bundle-age,
///   hop-count) appear at most once.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub primary: PrimaryBlock,
    pub blocks: Vec<Block>,
}

impl Bundle {
    /// Validates and wraps a primary block and its extension/payload blocks.
    pub fn new(primary: PrimaryBlock, blocks: Vec<Block>) -> Result<Self, Error> {
        let bundle = Self { primary, blocks };
        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), Error> {
        let mut seen_numbers = std::collections::HashSet::new();
        let mut seen_singletons = std::collections::HashSet::new();
        let mut payload_idx = None;

        for (idx, block) in self.blocks.iter().enumerate() {
            if block.block_number == 0 {
                return Err(Error::InvalidBlockNumber);
            }
            if !seen_numbers.insert(block.block_number) {
                return Err(Error::DuplicateBlockNumber(block.block_number));
            }
            if block.block_type.is_singleton() && !seen_singletons.insert(block.block_type) {
                return Err(Error::DuplicateBlocks(block.block_type));
            }
            if block.block_type == BlockType::Payload {
                if block.block_number != 1 {
                    return Err(Error::InvalidPayloadBlockNumber(block.block_number));
                }
                payload_idx = Some(idx);
            }
        }

        match payload_idx {
            None => Err(Error::MissingPayload),
            Some(idx) if idx != self.blocks.len() - 1 => Err(Error::PayloadNotFinal),
            Some(_) => Ok(()),
        }
    }

    pub fn id(&self) -> BundleId {
        BundleId::from_primary_block(&self.primary)
    }

    /// The instant after which this bundle is eligible for expiry.
    pub fn expiry(&self) -> crate::dtn_time::DtnTime {
        self.primary.expiry()
    }

    pub fn payload(&self) -> &Block {
        self.blocks
            .iter()
            .find(|b| b.block_type == BlockType::Payload)
            .expect("validated bundle always has a payload block")
    }

    pub fn block(&self, block_type: BlockType) -> Option<&Block> {
        self.blocks.iter().find(|b| b.block_type == block_type)
    }

    fn block_mut(&mut self, block_type: BlockType) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.block_type == block_type)
    }

    pub fn previous_node(&self) -> Option<crate::eid::Eid> {
        let block = self.block(BlockType::PreviousNode)?;
        crate::eid::parse_block_eid(&block.data).ok().map(|(eid, _, _)| eid)
    }

    /// Stamps (creating if absent) the previous-node block with `eid`, as
    /// routing does on every successful forward.
    pub fn set_previous_node(&mut self, eid: &crate::eid::Eid) {
        let mut encoder = encode::Encoder::new();
        crate::eid::emit_block_eid(&mut encoder, eid);
        let data = encoder.build();

        if let Some(block) = self.block_mut(BlockType::PreviousNode) {
            block.data = data;
        } else {
            let number = self.next_block_number();
            self.blocks.insert(
                0,
                Block::new(
                    BlockType::PreviousNode,
                    number,
                    crate::block_flags::BlockFlags::default(),
                    self.primary.crc_type,
                    data,
                ),
            );
        }
    }

    /// Returns `true` and bumps the hop count if this bundle carries a
    /// hop-count block that has not yet reached its limit. Bundles without
    /// one are unaffected and always return `true`.
    pub fn increment_hop_count(&mut self) -> bool {
        let Some(block) = self.block_mut(BlockType::HopCount) else {
            return true;
        };
        let Ok((info, _, _)) = <crate::hop_info::HopInfo as decode::FromCbor>::from_cbor(&block.data) else {
            return true;
        };
        match info.increment() {
            None => false,
            Some(incremented) => {
                let mut encoder = encode::Encoder::new();
                encoder.emit(&incremented);
                block.data = encoder.build();
                true
            }
        }
    }

    /// Verifies every block's CRC, including the primary block's.
    pub fn check_crc(&self) -> Result<(), Error> {
        if !self.primary.crc_ok() {
            return Err(Error::InvalidCrc);
        }
        for block in &self.blocks {
            if !block.crc_ok() {
                return Err(Error::InvalidCrc);
            }
        }
        Ok(())
    }

    /// Returns the next block number that is not yet in use.
    pub fn next_block_number(&self) -> u64 {
        self.blocks.iter().map(|b| b.block_number).max().unwrap_or(1) + 1
    }

    /// Serializes the full bundle as a CBOR indefinite-length array of
    /// blocks, as RFC 9171 requires: the primary block first, extension
    /// blocks in any order, the payload block last.
    pub fn emit(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.emit_array(Some(1 + self.blocks.len()), |a| {
            a.emit(&encode::Raw(&self.primary.emit()));
            for block in &self.blocks {
                a.emit(&encode::Raw(&block.emit()));
            }
        });
        encoder.build()
    }
}

impl decode::FromCbor for Bundle {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        let mut shortest = true;
        let (bundle, len) = decode::parse_value(data, |value, s, tags| {
            shortest = s && tags.is_empty();
            let Value::Array(a) = value else {
                return Err(Error::Unsupported("bundle is not a CBOR array".into()));
            };
            shortest = shortest && a.is_definite();

            let primary = a.parse::<PrimaryBlock>()?;
            let mut blocks = Vec::new();
            while let Some(block) = a.try_parse::<Block>().map_err(Error::InvalidCBOR)? {
                blocks.push(block);
            }
            Bundle::new(primary, blocks)
        })?;
        Ok((bundle, shortest, len))
    }
}
