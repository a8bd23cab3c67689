//! Per-bundle routing state: where a strategy is in forwarding a bundle it
//! has accepted responsibility for.

use bp7::eid::Eid;
use bp7::BundleId;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A bundle's progress through this node's routing responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Accepted, not yet offered to any peer.
    New,
    /// Offered to at least one peer; still eligible for more.
    Active,
    /// Confirmed delivered to its destination; no further forwarding.
    Delivered,
    /// Past its expiry instant; no further forwarding.
    Expired,
}

struct Descriptor {
    state: State,
    sent_to: HashSet<Eid>,
}

/// Tracks [`State`] and the peers already offered each bundle, one lock,
/// independent of the peer table and any strategy-private side tables.
#[derive(Default)]
pub struct DescriptorTable {
    descriptors: Mutex<HashMap<BundleId, Descriptor>>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a bundle as `New` if this is the first time it has been
    /// seen; a bundle already tracked is left untouched.
    pub fn track(&self, id: &BundleId) {
        self.descriptors.lock().unwrap().entry(id.clone()).or_insert_with(|| Descriptor {
            state: State::New,
            sent_to: HashSet::new(),
        });
    }

    pub fn state(&self, id: &BundleId) -> Option<State> {
        self.descriptors.lock().unwrap().get(id).map(|d| d.state.clone())
    }

    pub fn mark_delivered(&self, id: &BundleId) {
        if let Some(d) = self.descriptors.lock().unwrap().get_mut(id) {
            d.state = State::Delivered;
        }
    }

    pub fn mark_expired(&self, id: &BundleId) {
        if let Some(d) = self.descriptors.lock().unwrap().get_mut(id) {
            d.state = State::Expired;
        }
    }

    pub fn already_sent_to(&self, id: &BundleId, peer: &Eid) -> bool {
        self.descriptors
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|d| d.sent_to.contains(peer))
    }

    /// Records a successful send and advances `New` bundles to `Active`.
    pub fn record_sent(&self, id: &BundleId, peer: Eid) {
        let mut descriptors = self.descriptors.lock().unwrap();
        let d = descriptors.entry(id.clone()).or_insert_with(|| Descriptor {
            state: State::New,
            sent_to: HashSet::new(),
        });
        d.sent_to.insert(peer);
        if d.state == State::New {
            d.state = State::Active;
        }
    }

    pub fn forget(&self, id: &BundleId) {
        self.descriptors.lock().unwrap().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp7::creation_timestamp::CreationTimestamp;
    use bp7::dtn_time::DtnTime;

    fn sample_id() -> BundleId {
        BundleId {
            source: Eid::ipn(1, 0),
            timestamp: CreationTimestamp::new(DtnTime::new(1, 0), 0),
            is_fragment: false,
            fragment_offset: 0,
        }
    }

    #[test]
    fn new_bundle_becomes_active_after_first_send() {
        let table = DescriptorTable::new();
        let id = sample_id();
        table.track(&id);
        assert_eq!(table.state(&id), Some(State::New));
        table.record_sent(&id, Eid::ipn(2, 0));
        assert_eq!(table.state(&id), Some(State::Active));
        assert!(table.already_sent_to(&id, &Eid::ipn(2, 0)));
        assert!(!table.already_sent_to(&id, &Eid::ipn(3, 0)));
    }
}
