//! Endpoint identifiers: `dtn:` and `ipn:` scheme URIs naming bundle sources,
//! destinations, report-to endpoints and previous-node hops.

use crate::error::Error;
use bp7_cbor::decode;
use bp7_cbor::encode::{self, Encoder};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::cmp::Ordering;
use std::str::FromStr;

const PATH_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// An endpoint identifier, immutable once constructed and compared by its
/// normalized URI string.
#[derive(Debug, Clone, Eq)]
pub enum Eid {
    /// The `dtn:none` null endpoint, used as a source when a bundle's
    /// originator does not wish to be identified.
    DtnNone,
    /// A `dtn://host/demux` endpoint.
    Dtn { host: String, demux: String },
    /// An `ipn:node.service` endpoint.
    Ipn { node: u64, service: u64 },
}

impl Eid {
    pub fn dtn_none() -> Self {
        Eid::DtnNone
    }

    pub fn dtn(host: impl Into<String>, demux: impl Into<String>) -> Self {
        Eid::Dtn {
            host: host.into(),
            demux: demux.into(),
        }
    }

    pub fn ipn(node: u64, service: u64) -> Self {
        Eid::Ipn { node, service }
    }

    fn normalized(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Eid {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl std::hash::Hash for Eid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state)
    }
}

impl PartialOrd for Eid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Eid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Eid::DtnNone => f.write_str("dtn:none"),
            Eid::Dtn { host, demux } => {
                write!(f, "dtn://{host}/")?;
                f.write_str(&utf8_percent_encode(demux, PATH_ENCODE_SET).to_string())
            }
            Eid::Ipn { node, service } => write!(f, "ipn:{node}.{service}"),
        }
    }
}

impl FromStr for Eid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "dtn:none" {
            return Ok(Eid::DtnNone);
        }
        if let Some(rest) = s.strip_prefix("dtn://") {
            let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
            if host.is_empty() {
                return Err(Error::InvalidEid(s.to_string()));
            }
            let demux = percent_decode_str(path)
                .decode_utf8()
                .map_err(|_| Error::InvalidEid(s.to_string()))?
                .into_owned();
            return Ok(Eid::Dtn {
                host: host.to_string(),
                demux,
            });
        }
        if let Some(rest) = s.strip_prefix("ipn:") {
            let (node, service) = rest.split_once('.').ok_or_else(|| Error::InvalidEid(s.to_string()))?;
            let node: u64 = node.parse().map_err(|_| Error::InvalidEid(s.to_string()))?;
            let service: u64 = service.parse().map_err(|_| Error::InvalidEid(s.to_string()))?;
            return Ok(Eid::Ipn { node, service });
        }
        Err(Error::InvalidEid(s.to_string()))
    }
}

/// The primary block carries its destination/source/report-to endpoints as
/// the plain normalized URI string (the "flat URI form").
impl encode::ToCbor for Eid {
    type Result = ();

    fn to_cbor(&self, encoder: &mut Encoder) -> Self::Result {
        encoder.emit(&self.to_string())
    }
}

impl decode::FromCbor for Eid {
    type Error = Error;

    fn from_cbor(data: &[u8]) -> Result<(Self, bool, usize), Self::Error> {
        let (s, shortest, len) =
            <String as decode::FromCbor>::from_cbor(data).map_err(Error::InvalidCBOR)?;
        Ok((Eid::from_str(&s)?, shortest, len))
    }
}

/// The scheme name as it appears in the two-element `[scheme, ssp]` array
/// form used for endpoint references carried *inside* a block's data (the
/// previous-node block, and status-report subject references).
fn scheme_name(eid: &Eid) -> &'static str {
    match eid {
        Eid::DtnNone | Eid::Dtn { .. } => "dtn",
        Eid::Ipn { .. } => "ipn",
    }
}

fn scheme_specific_part(eid: &Eid) -> String {
    match eid {
        Eid::DtnNone => "none".to_string(),
        Eid::Dtn { host, demux } => format!("//{host}/{}", utf8_percent_encode(demux, PATH_ENCODE_SET)),
        Eid::Ipn { node, service } => format!("{node}.{service}"),
    }
}

/// Encodes an endpoint ID as the two-element `[scheme-string,
/// scheme-specific-part-string]` array used inside block bodies.
pub fn emit_block_eid(encoder: &mut Encoder, eid: &Eid) {
    encoder.emit_array(Some(2), |a| {
        a.emit(scheme_name(eid));
        a.emit(&scheme_specific_part(eid));
    });
}

/// Decodes an endpoint ID from the two-element block-interior array form.
pub fn parse_block_eid(data: &[u8]) -> Result<(Eid, bool, usize), Error> {
    crate::cbor_support::parse_array(data, |a| {
        let scheme: String = a.parse().map_err(Error::InvalidCBOR)?;
        let ssp: String = a.parse().map_err(Error::InvalidCBOR)?;
        let uri = match scheme.as_str() {
            "dtn" if ssp == "none" => "dtn:none".to_string(),
            "dtn" => format!("dtn:{ssp}"),
            "ipn" => format!("ipn:{ssp}"),
            other => return Err(Error::Unsupported(format!("endpoint scheme {other}"))),
        };
        Eid::from_str(&uri)
    })
    .map(|(eid, shortest, len)| (eid, shortest, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtn_none_round_trips_through_display() {
        assert_eq!(Eid::dtn_none().to_string(), "dtn:none");
        assert_eq!(Eid::from_str("dtn:none").unwrap(), Eid::DtnNone);
    }

    #[test]
    fn ipn_round_trips_through_display() {
        let e = Eid::ipn(5, 7);
        assert_eq!(e.to_string(), "ipn:5.7");
        assert_eq!(Eid::from_str("ipn:5.7").unwrap(), e);
    }

    #[test]
    fn dtn_host_demux_round_trips_through_display() {
        let e = Eid::dtn("node1", "mail");
        assert_eq!(e.to_string(), "dtn://node1/mail");
        assert_eq!(Eid::from_str("dtn://node1/mail").unwrap(), e);
    }

    #[test]
    fn ordering_is_total_and_by_normalized_string() {
        let a = Eid::ipn(1, 1);
        let b = Eid::ipn(1, 2);
        assert!(a < b);
    }
}
