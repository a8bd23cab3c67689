//! Primary block bundle processing control flags (RFC 9171 §4.2.3).

use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BundleFlags {
    pub is_fragment: bool,
    pub is_admin_record: bool,
    pub do_not_fragment: bool,
    pub app_ack_requested: bool,
    pub report_status_time: bool,
    pub receipt_report_requested: bool,
    pub forward_report_requested: bool,
    pub delivery_report_requested: bool,
    pub delete_report_requested: bool,
    pub unrecognised: u64,
}

impl From<u64> for BundleFlags {
    fn from(v: u64) -> Self {
        Self {
            is_fragment: v & (1 << 0) != 0,
            is_admin_record: v & (1 << 1) != 0,
            do_not_fragment: v & (1 << 2) != 0,
            app_ack_requested: v & (1 << 5) != 0,
            report_status_time: v & (1 << 6) != 0,
            receipt_report_requested: v & (1 << 14) != 0,
            forward_report_requested: v & (1 << 16) != 0,
            delivery_report_requested: v & (1 << 17) != 0,
            delete_report_requested: v & (1 << 18) != 0,
            unrecognised: v
                & !((1 << 0)
                    | (1 << 1)
                    | (1 << 2)
                    | (1 << 5)
                    | (1 << 6)
                    | (1 << 14)
                    | (1 << 16)
                    | (1 << 17)
                    | (1 << 18)),
        }
    }
}

impl From<BundleFlags> for u64 {
    fn from(f: BundleFlags) -> Self {
        let mut v = f.unrecognised;
        v |= (f.is_fragment as u64) << 0;
        v |= (f.is_admin_record as u64) << 1;
        v |= (f.do_not_fragment as u64) << 2;
        v |= (f.app_ack_requested as u64) << 5;
        v |= (f.report_status_time as u64) << 6;
        v |= (f.receipt_report_requested as u64) << 14;
        v |= (f.forward_report_requested as u64) << 16;
        v |= (f.delivery_report_requested as u64) << 17;
        v |= (f.delete_report_requested as u64) << 18;
        v
    }
}

impl encode::ToCbor for BundleFlags {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit(&u64::from(*self))
    }
}

impl decode::FromCbor for BundleFlags {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        let (v, shortest, len) =
            <u64 as decode::FromCbor>::from_cbor(data).map_err(Error::InvalidCBOR)?;
        Ok((BundleFlags::from(v), shortest, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        let f = BundleFlags {
            is_fragment: true,
            delivery_report_requested: true,
            ..Default::default()
        };
        let v = u64::from(f);
        assert_eq!(v, (1 << 0) | (1 << 17));
        assert_eq!(BundleFlags::from(v), f);
    }
}
