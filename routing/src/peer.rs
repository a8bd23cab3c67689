//! The set of neighbours a node currently believes it can reach.

use bp7::eid::Eid;
use bp7_cla::EndpointAddress;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A peer drops out of [`PeerTable::active`] once it has been this long
/// since its last `NotifyPeerAppeared`/refresh, even without an explicit
/// `NotifyPeerDisappeared`.
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

struct PeerState {
    endpoint: EndpointAddress,
    last_seen: Instant,
}

/// Neighbour table, one lock, independent of every other routing table.
#[derive(Default)]
pub struct PeerTable {
    peers: Mutex<HashMap<Eid, PeerState>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    pub fn appeared(&self, peer: Eid, endpoint: EndpointAddress) {
        self.peers.lock().unwrap().insert(
            peer,
            PeerState {
                endpoint,
                last_seen: Instant::now(),
            },
        );
    }

    pub fn disappeared(&self, peer: &Eid) {
        self.peers.lock().unwrap().remove(peer);
    }

    /// A snapshot of peers seen within the staleness window.
    pub fn active(&self) -> Vec<(Eid, EndpointAddress)> {
        let cutoff = Instant::now() - STALE_AFTER;
        self.peers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, state)| state.last_seen >= cutoff)
            .map(|(eid, state)| (eid.clone(), state.endpoint))
            .collect()
    }

    pub fn endpoint_of(&self, peer: &Eid) -> Option<EndpointAddress> {
        let cutoff = Instant::now() - STALE_AFTER;
        let peers = self.peers.lock().unwrap();
        let state = peers.get(peer)?;
        (state.last_seen >= cutoff).then_some(state.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn appeared_then_disappeared_is_not_active() {
        let table = PeerTable::new();
        let addr = EndpointAddress::Tcp(SocketAddr::from(([127, 0, 0, 1], 4556)));
        let peer = Eid::ipn(2, 0);
        table.appeared(peer.clone(), addr);
        assert_eq!(table.active().len(), 1);
        table.disappeared(&peer);
        assert!(table.active().is_empty());
    }
}
