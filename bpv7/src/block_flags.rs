//! Canonical block processing control flags (RFC 9171 §4.3.1).

use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags {
    pub must_replicate: bool,
    pub report_on_failure: bool,
    pub delete_bundle_on_failure: bool,
    pub status_report_requested: bool,
    pub delete_block_on_failure: bool,
    pub unrecognised: u64,
}

impl From<u64> for BlockFlags {
    fn from(v: u64) -> Self {
        Self {
            must_replicate: v & (1 << 0) != 0,
            report_on_failure: v & (1 << 1) != 0,
            delete_bundle_on_failure: v & (1 << 2) != 0,
            status_report_requested: v & (1 << 3) != 0,
            delete_block_on_failure: v & (1 << 4) != 0,
            unrecognised: v & !((1 << 0) | (1 << 1) | (1 << 2) | (1 << 3) | (1 << 4)),
        }
    }
}

impl From<BlockFlags> for u64 {
    fn from(f: BlockFlags) -> Self {
        let mut v = f.unrecognised;
        v |= (f.must_replicate as u64) << 0;
        v |= (f.report_on_failure as u64) << 1;
        v |= (f.delete_bundle_on_failure as u64) << 2;
        v |= (f.status_report_requested as u64) << 3;
        v |= (f.delete_block_on_failure as u64) << 4;
        v
    }
}

impl encode::ToCbor for BlockFlags {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit(&u64::from(*self))
    }
}

impl decode::FromCbor for BlockFlags {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        let (v, shortest, len) =
            <u64 as decode::FromCbor>::from_cbor(data).map_err(Error::InvalidCBOR)?;
        Ok((BlockFlags::from(v), shortest, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        let f = BlockFlags {
            delete_block_on_failure: true,
            status_report_requested: true,
            ..Default::default()
        };
        assert_eq!(BlockFlags::from(u64::from(f)), f);
    }
}
