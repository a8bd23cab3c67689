//! Epidemic routing: every eligible bundle is flooded to every eligible
//! peer, with no copy limit.

use crate::contract::{eligible, forward_to, Origin, Strategy};
use crate::descriptor::DescriptorTable;
use crate::peer::PeerTable;
use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7::dtn_time::DtnTime;
use bp7::eid::Eid;
use bp7::BundleId;
use bp7_cla::{EndpointAddress, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Epidemic routing strategy: no copy budget, flood to every peer not yet
/// offered the bundle.
pub struct Epidemic {
    local_eid: Mutex<Option<Eid>>,
    peers: PeerTable,
    descriptors: DescriptorTable,
    bundles: Mutex<HashMap<BundleId, Arc<Bundle>>>,
}

impl Default for Epidemic {
    fn default() -> Self {
        Self::new()
    }
}

impl Epidemic {
    pub fn new() -> Self {
        Self {
            local_eid: Mutex::new(None),
            peers: PeerTable::new(),
            descriptors: DescriptorTable::new(),
            bundles: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Strategy for Epidemic {
    fn initialize(&self, local_eid: Eid) {
        *self.local_eid.lock().unwrap() = Some(local_eid);
    }

    fn notify_new_bundle(&self, bundle: Arc<Bundle>, _origin: Origin) {
        let id = bundle.id();
        self.descriptors.track(&id);
        self.bundles.lock().unwrap().insert(id, bundle);
    }

    fn notify_peer_appeared(&self, peer: Eid, endpoint: EndpointAddress) {
        self.peers.appeared(peer, endpoint);
    }

    fn notify_peer_disappeared(&self, peer: Eid) {
        self.peers.disappeared(&peer);
    }

    async fn dispatch_bundles(&self, sender: &dyn Sender) -> usize {
        let Some(local_eid) = self.local_eid.lock().unwrap().clone() else {
            return 0;
        };
        let now = DtnTime::now();
        let bundles: Vec<Arc<Bundle>> = self.bundles.lock().unwrap().values().cloned().collect();
        let peers = self.peers.active();

        let mut sent = 0;
        for bundle in &bundles {
            if bundle.expiry() < now {
                self.descriptors.mark_expired(&bundle.id());
                continue;
            }
            for (peer, endpoint) in &peers {
                if !eligible(bundle, &local_eid, peer, &self.descriptors, now) {
                    continue;
                }
                if forward_to(sender, &local_eid, bundle, peer, endpoint, &self.descriptors).await {
                    sent += 1;
                }
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bp7::builder::Builder;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSender {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Sender for CountingSender {
        async fn send(&self, _bundle: &Bundle, _endpoint: &EndpointAddress) -> bool {
            self.sent.fetch_add(1, Ordering::SeqCst);
            true
        }
        async fn is_endpoint_reachable(&self, _endpoint: &EndpointAddress) -> bool {
            true
        }
    }

    fn addr(port: u16) -> EndpointAddress {
        EndpointAddress::Tcp(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[tokio::test]
    async fn zero_peers_sends_nothing() {
        let strategy = Epidemic::new();
        strategy.initialize(Eid::ipn(1, 0));
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);

        let sender = CountingSender { sent: AtomicUsize::new(0) };
        assert_eq!(strategy.dispatch_bundles(&sender).await, 0);
    }

    #[tokio::test]
    async fn floods_every_peer_once() {
        let strategy = Epidemic::new();
        strategy.initialize(Eid::ipn(1, 0));
        let bundle = Builder::new(Eid::ipn(9, 1), Eid::ipn(1, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);
        strategy.notify_peer_appeared(Eid::ipn(2, 0), addr(4001));
        strategy.notify_peer_appeared(Eid::ipn(3, 0), addr(4002));

        let sender = CountingSender { sent: AtomicUsize::new(0) };
        assert_eq!(strategy.dispatch_bundles(&sender).await, 2);
        assert_eq!(strategy.dispatch_bundles(&sender).await, 0);
    }
}
