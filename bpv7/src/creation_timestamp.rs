//! Bundle creation timestamp: the (creation time, sequence number) pair that,
//! together with the source endpoint ID, uniquely identifies a bundle.

use crate::cbor_support::parse_array;
use crate::dtn_time::DtnTime;
use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};
use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CreationTimestamp {
    pub creation_time: DtnTime,
    pub sequence_number: u64,
}

impl CreationTimestamp {
    /// Builds a timestamp for a bundle originated right now, using a
    /// monotonically increasing sequence number so bundles created within
    /// the same DTN-time second still sort distinctly.
    pub fn now() -> Self {
        Self {
            creation_time: DtnTime::now(),
            sequence_number: GLOBAL_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn new(creation_time: DtnTime, sequence_number: u64) -> Self {
        Self {
            creation_time,
            sequence_number,
        }
    }
}

impl std::fmt::Display for CreationTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.creation_time, self.sequence_number)
    }
}

impl encode::ToCbor for CreationTimestamp {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit_array(Some(2), |a| {
            a.emit(&self.creation_time);
            a.emit(&self.sequence_number);
        })
    }
}

impl decode::FromCbor for CreationTimestamp {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let creation_time = a.parse::<DtnTime>()?;
            let sequence_number = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            Ok(Self {
                creation_time,
                sequence_number,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_now_calls_have_increasing_sequence_numbers() {
        let a = CreationTimestamp::now();
        let b = CreationTimestamp::now();
        assert!(b.sequence_number > a.sequence_number);
    }
}
