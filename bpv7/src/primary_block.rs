//! The primary block (RFC 9171 §4.2): the one block every bundle has,
//! carrying routing and identity information.

use crate::bundle_flags::BundleFlags;
use crate::cbor_support::parse_array;
use crate::creation_timestamp::CreationTimestamp;
use crate::crc::{self, CrcType};
use crate::eid::Eid;
use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

pub const BP_VERSION: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentInfo {
    pub offset: u64,
    pub total_len: u64,
}

#[derive(Debug, Clone)]
pub struct PrimaryBlock {
    pub flags: BundleFlags,
    pub crc_type: CrcType,
    pub destination: Eid,
    pub source: Eid,
    pub report_to: Eid,
    pub timestamp: CreationTimestamp,
    /// Bundle lifetime in milliseconds, per the wire format.
    pub lifetime: u64,
    pub fragment_info: Option<FragmentInfo>,
    received_crc: Option<Vec<u8>>,
}

impl PrimaryBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flags: BundleFlags,
        crc_type: CrcType,
        destination: Eid,
        source: Eid,
        report_to: Eid,
        timestamp: CreationTimestamp,
        lifetime: u64,
        fragment_info: Option<FragmentInfo>,
    ) -> Self {
        Self {
            flags,
            crc_type,
            destination,
            source,
            report_to,
            timestamp,
            lifetime,
            fragment_info,
            received_crc: None,
        }
    }

    fn item_count(&self) -> usize {
        8 + if self.fragment_info.is_some() { 2 } else { 0 }
            + if matches!(self.crc_type, CrcType::None) { 0 } else { 1 }
    }

    pub fn emit(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        let mut crc_range = 0..0;
        encoder.emit_array(Some(self.item_count()), |a| {
            a.emit(&BP_VERSION);
            a.emit(&self.flags);
            a.emit(&self.crc_type);
            a.emit(&self.destination);
            a.emit(&self.source);
            a.emit(&self.report_to);
            a.emit(&self.timestamp);
            a.emit(&self.lifetime);
            if let Some(frag) = &self.fragment_info {
                a.emit(&frag.offset);
                a.emit(&frag.total_len);
            }
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

    /// The instant this bundle becomes eligible for expiry: creation time
    /// plus lifetime (converted from the wire's milliseconds to whole
    /// seconds, since [`crate::dtn_time::DtnTime`] only carries seconds on
    /// this wire).
    pub fn expiry(&self) -> crate::dtn_time::DtnTime {
        crate::dtn_time::DtnTime::new(
            self.timestamp.creation_time.seconds + self.lifetime / 1000,
            0,
        )
    }

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
}

impl decode::FromCbor for PrimaryBlock {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let version = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            if version != BP_VERSION {
                return Err(Error::InvalidVersion(version));
            }
            let flags = a.parse::<BundleFlags>()?;
            let crc_type = a.parse::<CrcType>()?;
            let destination = a.parse::<Eid>()?;
            let source = a.parse::<Eid>()?;
            let report_to = a.parse::<Eid>()?;
            let timestamp = a.parse::<CreationTimestamp>()?;
            let lifetime = a.parse::<u64>().map_err(Error::InvalidCBOR)?;

            let fragment_info = if flags.is_fragment {
                let offset = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
                let total_len = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
                Some(FragmentInfo { offset, total_len })
            } else {
                None
            };

            let received_crc = if matches!(crc_type, CrcType::None) {
                None
            } else {
                let crc: Box<[u8]> = a.parse().map_err(Error::InvalidCBOR)?;
                Some(crc.into_vec())
            };

            Ok(Self {
                flags,
                crc_type,
                destination,
                source,
                report_to,
                timestamp,
                lifetime,
                fragment_info,
                received_crc,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creation_timestamp::CreationTimestamp;
    use crate::dtn_time::DtnTime;

    fn sample() -> PrimaryBlock {
        PrimaryBlock::new(
            BundleFlags::default(),
            CrcType::Crc32,
            Eid::ipn(2, 1),
            Eid::ipn(1, 0),
            Eid::dtn_none(),
            CreationTimestamp::new(DtnTime::new(100, 0), 1),
            3600,
            None,
        )
    }

    #[test]
    fn round_trips_non_fragment() {
        let p = sample();
        let bytes = p.emit();
        let (parsed, _shortest, len) = PrimaryBlock::from_cbor(&bytes).unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(parsed.destination, p.destination);
        assert!(parsed.crc_ok());
    }

    #[test]
    fn round_trips_fragment() {
        let mut p = sample();
        p.flags.is_fragment = true;
        p.fragment_info = Some(FragmentInfo { offset: 10, total_len: 100 });
        let bytes = p.emit();
        let (parsed, _shortest, _len) = PrimaryBlock::from_cbor(&bytes).unwrap();
        assert_eq!(parsed.fragment_info, Some(FragmentInfo { offset: 10, total_len: 100 }));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut encoder = Encoder::new();
        encoder.emit_array(Some(8), |a| {
            a.emit(&6u64);
            a.emit(&0u64);
            a.emit(&0u64);
            a.emit(&Eid::dtn_none());
            a.emit(&Eid::dtn_none());
            a.emit(&Eid::dtn_none());
            a.emit(&CreationTimestamp::new(DtnTime::ZERO, 0));
            a.emit(&0u64);
        });
        let bytes = encoder.build();
        assert!(matches!(PrimaryBlock::from_cbor(&bytes), Err(Error::InvalidVersion(6))));
    }
}
