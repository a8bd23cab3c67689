//! Binary spray-and-wait routing: each bundle starts with a fixed copy
//! budget. While more than one copy remains, the budget is split in half
//! with each peer offered the bundle; once down to a single copy, it is
//! only ever handed directly to the destination.

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

/// Tunables for [`SprayAndWait`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Copies granted to a bundle this node originates.
    pub max_copies: u32,
    /// Copies assumed for a bundle relayed in from a peer. The wire format
    /// carries no copy count, so this is a local policy decision rather
    /// than a value recovered from the bundle itself; the conventional
    /// choice mirrors `max(1, max_copies / 2)`, but is left configurable.
    pub relayed_initial_copies: u32,
}

impl Config {
    pub fn new(max_copies: u32) -> Self {
        Self {
            max_copies,
            relayed_initial_copies: (max_copies / 2).max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(6)
    }
}

struct Entry {
    bundle: Arc<Bundle>,
    copies: u32,
}

/// Binary spray-and-wait routing strategy.
pub struct SprayAndWait {
    config: Config,
    local_eid: Mutex<Option<Eid>>,
    peers: PeerTable,
    descriptors: DescriptorTable,
    bundles: Mutex<HashMap<BundleId, Entry>>,
}

impl SprayAndWait {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            local_eid: Mutex::new(None),
            peers: PeerTable::new(),
            descriptors: DescriptorTable::new(),
            bundles: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Strategy for SprayAndWait {
    fn initialize(&self, local_eid: Eid) {
        *self.local_eid.lock().unwrap() = Some(local_eid);
    }

    fn notify_new_bundle(&self, bundle: Arc<Bundle>, origin: Origin) {
        let id = bundle.id();
        self.descriptors.track(&id);
        let copies = match origin {
            Origin::Local => self.config.max_copies,
            Origin::Relayed => self.config.relayed_initial_copies,
        };
        self.bundles.lock().unwrap().insert(id, Entry { bundle, copies });
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
        let snapshot: Vec<(BundleId, Arc<Bundle>)> = {
            let bundles = self.bundles.lock().unwrap();
            bundles.iter().map(|(id, e)| (id.clone(), e.bundle.clone())).collect()
        };
        let peers = self.peers.active();

        let mut sent = 0;
        for (id, bundle) in snapshot {
            if bundle.expiry() < now {
                self.descriptors.mark_expired(&id);
                self.bundles.lock().unwrap().remove(&id);
                continue;
            }

            for (peer, endpoint) in &peers {
                if !eligible(&bundle, &local_eid, peer, &self.descriptors, now) {
                    continue;
                }
                let copies = match self.bundles.lock().unwrap().get(&id) {
                    Some(e) => e.copies,
                    None => break,
                };
                if copies == 0 {
                    continue;
                }

                if copies == 1 {
                    // Wait phase: only the destination itself is offered the bundle.
                    if *peer != bundle.primary.destination {
                        continue;
                    }
                    if forward_to(sender, &local_eid, &bundle, peer, endpoint, &self.descriptors).await {
                        sent += 1;
                        self.descriptors.mark_delivered(&id);
                    }
                    continue;
                }

                // Spray phase: give half the remaining copies to this peer,
                // keep the rest. A failed send leaves the budget untouched.
                let half = copies / 2;
                let remainder = copies - half;
                if remainder == 0 {
                    continue;
                }
                if forward_to(sender, &local_eid, &bundle, peer, endpoint, &self.descriptors).await {
                    sent += 1;
                    if let Some(entry) = self.bundles.lock().unwrap().get_mut(&id) {
                        entry.copies = remainder;
                    }
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

    struct RefusingSender;

    #[async_trait]
    impl Sender for RefusingSender {
        async fn send(&self, _bundle: &Bundle, _endpoint: &EndpointAddress) -> bool {
            false
        }
        async fn is_endpoint_reachable(&self, _endpoint: &EndpointAddress) -> bool {
            true
        }
    }

    fn addr(port: u16) -> EndpointAddress {
        EndpointAddress::Tcp(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[tokio::test]
    async fn max_copies_one_only_delivers_direct_to_destination() {
        let strategy = SprayAndWait::new(Config::new(1));
        strategy.initialize(Eid::ipn(1, 0));
        let destination = Eid::ipn(9, 1);
        let bundle = Builder::new(destination.clone(), Eid::ipn(1, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);

        // A relay peer that is not the destination must not be offered the
        // bundle once the budget has degenerated to direct delivery.
        strategy.notify_peer_appeared(Eid::ipn(2, 0), addr(4001));
        let sender = CountingSender { sent: AtomicUsize::new(0) };
        assert_eq!(strategy.dispatch_bundles(&sender).await, 0);

        strategy.notify_peer_appeared(destination, addr(4002));
        assert_eq!(strategy.dispatch_bundles(&sender).await, 1);
    }

    #[tokio::test]
    async fn spray_phase_halves_the_copy_budget() {
        let strategy = SprayAndWait::new(Config::new(4));
        strategy.initialize(Eid::ipn(1, 0));
        let bundle = Builder::new(Eid::ipn(9, 1), Eid::ipn(1, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);
        strategy.notify_peer_appeared(Eid::ipn(2, 0), addr(4001));

        let sender = CountingSender { sent: AtomicUsize::new(0) };
        assert_eq!(strategy.dispatch_bundles(&sender).await, 1);
        // 4 copies split to the first peer: keep 2, gave away 2.
        let remaining = strategy.bundles.lock().unwrap().values().next().unwrap().copies;
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn failed_send_restores_prior_copy_count() {
        let strategy = SprayAndWait::new(Config::new(4));
        strategy.initialize(Eid::ipn(1, 0));
        let bundle = Builder::new(Eid::ipn(9, 1), Eid::ipn(1, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);
        strategy.notify_peer_appeared(Eid::ipn(2, 0), addr(4001));

        assert_eq!(strategy.dispatch_bundles(&RefusingSender).await, 0);
        let remaining = strategy.bundles.lock().unwrap().values().next().unwrap().copies;
        assert_eq!(remaining, 4);
    }
}
