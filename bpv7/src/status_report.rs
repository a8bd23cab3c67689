//! Bundle status reports: the administrative record an agent sends back to a
//! bundle's report-to endpoint to describe what happened to it.

use crate::cbor_support::parse_array;
use crate::creation_timestamp::CreationTimestamp;
use crate::dtn_time::DtnTime;
use crate::eid::Eid;
use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

/// Reasons a status report can cite for why a bundle reached a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    NoInformation,
    LifetimeExpired,
    ForwardedUnidirectionalLink,
    TransmissionCancelled,
    DepletedStorage,
    DestinationEidUnintelligible,
    NoKnownRouteToDestination,
    NoTimelyContactWithNextNode,
    BlockUnintelligible,
    HopLimitExceeded,
    TrafficPared,
    BlockUnsupported,
    Unassigned(u64),
}

impl From<u64> for ReasonCode {
    fn from(v: u64) -> Self {
        match v {
            0 => ReasonCode::NoInformation,
            1 => ReasonCode::LifetimeExpired,
            2 => ReasonCode::ForwardedUnidirectionalLink,
            3 => ReasonCode::TransmissionCancelled,
            4 => ReasonCode::DepletedStorage,
            5 => ReasonCode::DestinationEidUnintelligible,
            6 => ReasonCode::NoKnownRouteToDestination,
            7 => ReasonCode::NoTimelyContactWithNextNode,
            8 => ReasonCode::BlockUnintelligible,
            9 => ReasonCode::HopLimitExceeded,
            10 => ReasonCode::TrafficPared,
            11 => ReasonCode::BlockUnsupported,
            v => ReasonCode::Unassigned(v),
        }
    }
}

impl From<ReasonCode> for u64 {
    fn from(r: ReasonCode) -> Self {
        match r {
            ReasonCode::NoInformation => 0,
            ReasonCode::LifetimeExpired => 1,
            ReasonCode::ForwardedUnidirectionalLink => 2,
            ReasonCode::TransmissionCancelled => 3,
            ReasonCode::DepletedStorage => 4,
            ReasonCode::DestinationEidUnintelligible => 5,
            ReasonCode::NoKnownRouteToDestination => 6,
            ReasonCode::NoTimelyContactWithNextNode => 7,
            ReasonCode::BlockUnintelligible => 8,
            ReasonCode::HopLimitExceeded => 9,
            ReasonCode::TrafficPared => 10,
            ReasonCode::BlockUnsupported => 11,
            ReasonCode::Unassigned(v) => v,
        }
    }
}

bitflags::bitflags! {
    /// Which of a bundle's status-report milestones this report asserts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const RECEIVED              = 0x01;
        const FORWARDED             = 0x02;
        const DELIVERED             = 0x04;
        const DELETED               = 0x08;
        const ACKNOWLEDGED_BY_CUSTODIAN = 0x10;
    }
}

/// The bundle this report is about, named the way a status report cites it:
/// by source EID plus its creation timestamp, and fragment offset if the
/// subject bundle was itself a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectBundle {
    pub source: Eid,
    pub timestamp: CreationTimestamp,
    pub is_fragment: bool,
    pub fragment_offset: Option<u64>,
}

impl encode::ToCbor for SubjectBundle {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit_array(Some(if self.is_fragment { 5 } else { 4 }), |a| {
            a.emit(&self.source.to_string());
            a.emit(&self.timestamp.creation_time.seconds);
            a.emit(&self.timestamp.sequence_number);
            a.emit(&self.is_fragment);
            if self.is_fragment {
                a.emit(&self.fragment_offset.unwrap_or(0));
            }
        })
    }
}

impl decode::FromCbor for SubjectBundle {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let source: String = a.parse().map_err(Error::InvalidCBOR)?;
            let seconds = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let sequence_number = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let is_fragment = a.parse::<bool>().map_err(Error::InvalidCBOR)?;
            let fragment_offset = if is_fragment {
                Some(a.parse::<u64>().map_err(Error::InvalidCBOR)?)
            } else {
                None
            };
            Ok(Self {
                source: source.parse()?,
                timestamp: CreationTimestamp::new(DtnTime::new(seconds, 0), sequence_number),
                is_fragment,
                fragment_offset,
            })
        })
    }
}

/// A bundle status report: the subject bundle identity, which milestones it
/// reached, why (if deleted), and when each milestone was reached.
#[derive(Debug, Clone)]
pub struct BundleStatusReport {
    pub status: StatusFlags,
    pub reason: ReasonCode,
    pub subject: SubjectBundle,
    pub received_at: DtnTime,
    pub forwarded_at: DtnTime,
    pub delivered_at: DtnTime,
    pub deleted_at: DtnTime,
}

impl BundleStatusReport {
    /// Builds a report whose four time slots already honor "zero when the
    /// corresponding flag is unset", so callers only need to supply the
    /// milestones that actually happened.
    pub fn new(subject: SubjectBundle, reason: ReasonCode) -> Self {
        Self {
            status: StatusFlags::empty(),
            reason,
            subject,
            received_at: DtnTime::ZERO,
            forwarded_at: DtnTime::ZERO,
            delivered_at: DtnTime::ZERO,
            deleted_at: DtnTime::ZERO,
        }
    }

    pub fn mark_received(&mut self, at: DtnTime) {
        self.status |= StatusFlags::RECEIVED;
        self.received_at = at;
    }

    pub fn mark_forwarded(&mut self, at: DtnTime) {
        self.status |= StatusFlags::FORWARDED;
        self.forwarded_at = at;
    }

    pub fn mark_delivered(&mut self, at: DtnTime) {
        self.status |= StatusFlags::DELIVERED;
        self.delivered_at = at;
    }

    pub fn mark_deleted(&mut self, at: DtnTime) {
        self.status |= StatusFlags::DELETED;
        self.deleted_at = at;
    }
}

impl encode::ToCbor for BundleStatusReport {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit_array(Some(7), |a| {
            a.emit(&(self.status.bits() as u64));
            a.emit(&u64::from(self.reason));
            a.emit(&self.subject);
            a.emit(&self.received_at.seconds);
            a.emit(&self.forwarded_at.seconds);
            a.emit(&self.delivered_at.seconds);
            a.emit(&self.deleted_at.seconds);
        })
    }
}

impl decode::FromCbor for BundleStatusReport {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let status_bits = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            let status = StatusFlags::from_bits_truncate(status_bits as u8);
            let reason = ReasonCode::from(a.parse::<u64>().map_err(Error::InvalidCBOR)?);
            let subject = a.parse::<SubjectBundle>()?;
            let received_at = DtnTime::new(a.parse::<u64>().map_err(Error::InvalidCBOR)?, 0);
            let forwarded_at = DtnTime::new(a.parse::<u64>().map_err(Error::InvalidCBOR)?, 0);
            let delivered_at = DtnTime::new(a.parse::<u64>().map_err(Error::InvalidCBOR)?, 0);
            let deleted_at = DtnTime::new(a.parse::<u64>().map_err(Error::InvalidCBOR)?, 0);
            Ok(Self {
                status,
                reason,
                subject,
                received_at,
                forwarded_at,
                delivered_at,
                deleted_at,
            })
        })
    }
}

/// Administrative record type codes (RFC 9171 §6.1).
const ADMIN_RECORD_TYPE_STATUS_REPORT: u64 = 1;

/// The payload of an administrative-record bundle, tagged by record type.
/// This is what gets CBOR-encoded and placed directly in the payload block
/// of a bundle whose primary block has the administrative-record flag set.
#[derive(Debug, Clone)]
pub enum AdministrativeRecord {
    BundleStatusReport(BundleStatusReport),
}

impl encode::ToCbor for AdministrativeRecord {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit_array(Some(2), |a| match self {
            AdministrativeRecord::BundleStatusReport(report) => {
                a.emit(&ADMIN_RECORD_TYPE_STATUS_REPORT);
                a.emit(report);
            }
        })
    }
}

impl decode::FromCbor for AdministrativeRecord {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        parse_array(data, |a| {
            let record_type = a.parse::<u64>().map_err(Error::InvalidCBOR)?;
            match record_type {
                ADMIN_RECORD_TYPE_STATUS_REPORT => {
                    Ok(AdministrativeRecord::BundleStatusReport(a.parse::<BundleStatusReport>()?))
                }
                other => Err(Error::Unsupported(format!("administrative record type {other}"))),
            }
        })
    }
}

impl AdministrativeRecord {
    /// Encodes this record as the raw bytes that belong in an
    /// administrative bundle's payload block.
    pub fn to_payload_bytes(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.emit(self);
        encoder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BundleStatusReport {
        let mut report = BundleStatusReport::new(
            SubjectBundle {
                source: Eid::ipn(1, 0),
                timestamp: CreationTimestamp::new(DtnTime::new(1, 0), 0),
                is_fragment: false,
                fragment_offset: None,
            },
            ReasonCode::NoInformation,
        );
        report.mark_received(DtnTime::new(10, 0));
        report.mark_delivered(DtnTime::new(20, 0));
        report
    }

    #[test]
    fn round_trips_through_cbor() {
        let report = sample();
        let mut encoder = Encoder::new();
        encoder.emit(&report);
        let bytes = encoder.build();
        let (parsed, _shortest, len) = BundleStatusReport::from_cbor(&bytes).unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(parsed.status, report.status);
        assert_eq!(parsed.received_at, report.received_at);
        assert_eq!(parsed.subject, report.subject);
    }

    #[test]
    fn fragment_subject_carries_offset() {
        let report = BundleStatusReport::new(
            SubjectBundle {
                source: Eid::ipn(1, 0),
                timestamp: CreationTimestamp::new(DtnTime::new(1, 0), 0),
                is_fragment: true,
                fragment_offset: Some(512),
            },
            ReasonCode::NoInformation,
        );
        let mut encoder = Encoder::new();
        encoder.emit(&report);
        let bytes = encoder.build();
        let (parsed, _shortest, _len) = BundleStatusReport::from_cbor(&bytes).unwrap();
        assert_eq!(parsed.subject.fragment_offset, Some(512));
    }

    #[test]
    fn administrative_record_wraps_status_report() {
        let record = AdministrativeRecord::BundleStatusReport(sample());
        let bytes = record.to_payload_bytes();
        let (parsed, _shortest, _len) = AdministrativeRecord::from_cbor(&bytes).unwrap();
        let AdministrativeRecord::BundleStatusReport(parsed) = parsed;
        assert_eq!(parsed.reason, ReasonCode::NoInformation);
    }
}
