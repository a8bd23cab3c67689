//! A fluent builder for constructing bundles, mirroring the way the primary
//! block and its extension blocks are assembled in sequence.

use crate::block::{Block, Type as BlockType};
use crate::block_flags::BlockFlags;
use crate::bundle::Bundle;
use crate::bundle_flags::BundleFlags;
use crate::creation_timestamp::CreationTimestamp;
use crate::crc::CrcType;
use crate::eid::Eid;
use crate::error::Error;
use crate::hop_info::HopInfo;
use crate::primary_block::PrimaryBlock;

pub struct Builder {
    destination: Eid,
    source: Eid,
    report_to: Option<Eid>,
    flags: BundleFlags,
    crc_type: CrcType,
    lifetime: u64,
    timestamp: Option<CreationTimestamp>,
    hop_limit: Option<u64>,
    previous_node: Option<Eid>,
    bundle_age: Option<u64>,
    payload: Option<Vec<u8>>,
}

impl Builder {
    pub fn new(destination: Eid, source: Eid) -> Self {
        Self {
            destination,
            source,
            report_to: None,
            flags: BundleFlags::default(),
            crc_type: CrcType::Crc32,
            lifetime: 3600,
            timestamp: None,
            hop_limit: None,
            previous_node: None,
            bundle_age: None,
            payload: None,
        }
    }

    pub fn report_to(mut self, eid: Eid) -> Self {
        self.report_to = Some(eid);
        self
    }

    pub fn flags(mut self, flags: BundleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn crc_type(mut self, crc_type: CrcType) -> Self {
        self.crc_type = crc_type;
        self
    }

    pub fn lifetime(mut self, lifetime: u64) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn timestamp(mut self, timestamp: CreationTimestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn hop_limit(mut self, limit: u64) -> Self {
        self.hop_limit = Some(limit);
        self
    }

    pub fn previous_node(mut self, eid: Eid) -> Self {
        self.previous_node = Some(eid);
        self
    }

    pub fn bundle_age(mut self, microseconds: u64) -> Self {
        self.bundle_age = Some(microseconds);
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = Some(data);
        self
    }

    fn build_primary(&self) -> PrimaryBlock {
        PrimaryBlock::new(
            self.flags,
            self.crc_type,
            self.destination.clone(),
            self.source.clone(),
            self.report_to.clone().unwrap_or(Eid::DtnNone),
            self.timestamp.unwrap_or_else(CreationTimestamp::now),
            self.lifetime,
            None,
        )
    }

    /// Builds only the primary block, useful for tests that exercise bundle
    /// validation without a full block set.
    #[cfg(test)]
    pub fn primary_only(&self) -> PrimaryBlock {
        self.build_primary()
    }

    pub fn build(self) -> Result<Bundle, Error> {
        let primary = self.build_primary();
        let mut blocks = Vec::new();
        let mut next_number = 2;

        if let Some(limit) = self.hop_limit {
            blocks.push(Block::new(
                BlockType::HopCount,
                next_number,
                BlockFlags::default(),
                self.crc_type,
                HopInfo::new(limit).to_cbor_bytes(),
            ));
            next_number += 1;
        }
        if let Some(eid) = &self.previous_node {
            let mut encoder = bp7_cbor::encode::Encoder::new();
            crate::eid::emit_block_eid(&mut encoder, eid);
            blocks.push(Block::new(
                BlockType::PreviousNode,
                next_number,
                BlockFlags::default(),
                self.crc_type,
                encoder.build(),
            ));
            next_number += 1;
        }
        if let Some(age) = self.bundle_age {
            blocks.push(Block::new(
                BlockType::BundleAge,
                next_number,
                BlockFlags::default(),
                self.crc_type,
                age.to_cbor_bytes(),
            ));
            next_number += 1;
        }

        let payload = self.payload.ok_or(Error::MissingPayload)?;
        blocks.push(Block::new(
            BlockType::Payload,
            1,
            BlockFlags::default(),
            self.crc_type,
            payload,
        ));
        let _ = next_number;

        Bundle::new(primary, blocks)
    }
}

/// Small helper so extension block bodies can be built from their typed
/// form without every caller reaching for an `Encoder` directly.
trait ToCborBytes {
    fn to_cbor_bytes(&self) -> Vec<u8>;
}

impl<T: bp7_cbor::encode::ToCbor> ToCborBytes for T {
    fn to_cbor_bytes(&self) -> Vec<u8> {
        let mut encoder = bp7_cbor::encode::Encoder::new();
        encoder.emit(self);
        encoder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_orders_payload_last() {
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .hop_limit(30)
            .bundle_age(0)
            .payload(b"x".to_vec())
            .build()
            .unwrap();
        assert_eq!(bundle.blocks.last().unwrap().block_type, BlockType::Payload);
    }

    #[test]
    fn build_without_payload_fails() {
        let err = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0)).build().unwrap_err();
        assert!(matches!(err, Error::MissingPayload));
    }
}
