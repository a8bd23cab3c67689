//! The bundle identity tuple used as the store's primary key.

use crate::creation_timestamp::CreationTimestamp;
use crate::eid::Eid;
use crate::primary_block::{FragmentInfo, PrimaryBlock};

/// Identifies a bundle (or one fragment of it) independent of storage
/// location: `(source, creation timestamp, is-fragment, fragment-offset)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId {
    pub source: Eid,
    pub timestamp: CreationTimestamp,
    pub is_fragment: bool,
    pub fragment_offset: u64,
}

impl BundleId {
    pub fn new(source: Eid, timestamp: CreationTimestamp, fragment_info: Option<&FragmentInfo>) -> Self {
        Self {
            source,
            timestamp,
            is_fragment: fragment_info.is_some(),
            fragment_offset: fragment_info.map(|f| f.offset).unwrap_or(0),
        }
    }

    pub fn from_primary_block(primary: &PrimaryBlock) -> Self {
        Self::new(primary.source.clone(), primary.timestamp, primary.fragment_info.as_ref())
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_fragment {
            write!(f, "{}-{}-{}", self.source, self.timestamp, self.fragment_offset)
        } else {
            write!(f, "{}-{}", self.source, self.timestamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtn_time::DtnTime;

    #[test]
    fn distinct_fragment_offsets_are_distinct_ids() {
        let source = Eid::ipn(1, 0);
        let ts = CreationTimestamp::new(DtnTime::new(1, 0), 0);
        let a = BundleId::new(source.clone(), ts, Some(&FragmentInfo { offset: 0, total_len: 100 }));
        let b = BundleId::new(source, ts, Some(&FragmentInfo { offset: 50, total_len: 100 }));
        assert_ne!(a, b);
    }
}
