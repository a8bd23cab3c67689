//! The Hop Count extension block (RFC 9171 §4.4.3): a hop limit and a
//! running count, bumped by each forwarding node.

use crate::cbor_support::parse_array;
use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopInfo {
    pub limit: u64,
    pub count: u64,
}

impl HopInfo {
    pub fn new(limit: u64) -> Self {
        Self { limit, count: 0 }
    }

    /// Returns a copy with the hop count incremented, or `None` if doing so
    /// would exceed the hop limit (the bundle should be dropped).
    pub fn increment(&self) -> Option<Self> {
        if self.count >= self.limit {
            None
        } else {
            Some(Self {
                limit: self.limit,
                count: self.count + 1,
            })
        }
    }
}

impl encode::ToCbor for HopInfo {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit_array(Some(2), |a| {
            a.emit(&self.limit);
            a.emit(&self.count);
        })
    }
}

impl decode::FromCbor for HopInfo {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let limit = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let count = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            Ok(Self { limit, count })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_saturates_at_limit() {
        let h = HopInfo { limit: 1, count: 1 };
        assert!(h.increment().is_none());
    }
}
