//! Wires the store, fragmentation manager, a routing strategy and the TCP
//! and UDP convergence layers into one running node.

use crate::config::Config;
use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7::dtn_time::DtnTime;
use bp7::eid::Eid;
use bp7_cla::tcp::TcpCla;
use bp7_cla::udp::UdpCla;
use bp7_cla::{EndpointAddress, Receiver, Sender};
use bp7_fragment::{AddFragmentOutcome, ReassemblyManager, SplitOutcome};
use bp7_routing::{Origin, Strategy};
use bp7_store::Store;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Invoked once per bundle addressed to this node, with its payload ready
/// to hand to the application it belongs to.
pub type DeliveryCallback = Arc<dyn Fn(Bundle) + Send + Sync>;

/// A running BPv7 node: accepts local submissions and inbound bundles,
/// reassembles fragments, drives a routing strategy, and forwards over
/// whichever convergence layer an [`EndpointAddress`] names.
pub struct Node {
    config: Config,
    store: Arc<Store>,
    reassembly: Arc<ReassemblyManager>,
    strategy: Arc<dyn Strategy>,
    tcp: Arc<TcpCla>,
    udp: Arc<UdpCla>,
    delivery: Mutex<Option<DeliveryCallback>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub fn new(config: Config, strategy: Arc<dyn Strategy>) -> Arc<Self> {
        let tcp = TcpCla::new(config.tcp.clone());
        let udp = UdpCla::new(config.udp.clone());
        Arc::new(Self {
            store: Arc::new(Store::new(config.store.clone())),
            reassembly: Arc::new(ReassemblyManager::new()),
            strategy,
            tcp,
            udp,
            config,
            delivery: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Registers the callback invoked for every bundle addressed to this
    /// node's own endpoint. Call before [`Node::start`].
    pub fn set_delivery_callback(&self, callback: DeliveryCallback) {
        *self.delivery.lock().unwrap() = Some(callback);
    }

    /// Submits a bundle from a local application: splits it if it exceeds
    /// the configured fragment size, then hands the result to routing.
    pub fn submit(&self, bundle: Bundle) -> bool {
        match bp7_fragment::split(&bundle, self.config.max_fragment_size) {
            SplitOutcome::Whole => self.accept_outbound(bundle),
            SplitOutcome::Fragments(fragments) => {
                let mut ok = true;
                for fragment in fragments {
                    ok &= self.accept_outbound(fragment);
                }
                ok
            }
        }
    }

    fn accept_outbound(&self, bundle: Bundle) -> bool {
        if !self.store.push(bundle.clone()) {
            warn!(id = %bundle.id(), "submit rejected: store full or duplicate");
            return false;
        }
        self.strategy.notify_new_bundle(Arc::new(bundle), Origin::Local);
        true
    }

    fn handle_inbound(self: &Arc<Self>, bundle: Bundle, _peer: Option<Eid>) {
        let complete = if bundle.primary.flags.is_fragment {
            match self.reassembly.add_fragment(bundle) {
                AddFragmentOutcome::Completed(b) => Some(b),
                AddFragmentOutcome::Accepted
                | AddFragmentOutcome::DuplicateOffset
                | AddFragmentOutcome::Abandoned => None,
            }
        } else {
            Some(bundle)
        };

        let Some(bundle) = complete else { return };

        if bundle.primary.destination == self.config.local_eid {
            debug!(id = %bundle.id(), "bundle delivered locally");
            if let Some(cb) = self.delivery.lock().unwrap().as_ref() {
                cb(bundle);
            }
            return;
        }

        if !self.store.push(bundle.clone()) {
            trace!(id = %bundle.id(), "relayed bundle dropped: store full or duplicate");
            return;
        }
        self.strategy.notify_new_bundle(Arc::new(bundle), Origin::Relayed);
    }

    /// Registers inbound callbacks, binds both convergence layers, and
    /// starts the periodic cleanup and routing-dispatch timers.
    pub async fn start(self: &Arc<Self>) -> std::io::Result<()> {
        self.strategy.initialize(self.config.local_eid.clone());

        let this = self.clone();
        self.tcp.set_callback(Arc::new(move |bundle, peer| this.handle_inbound(bundle, peer)));
        let this = self.clone();
        self.udp.set_callback(Arc::new(move |bundle, peer| this.handle_inbound(bundle, peer)));

        self.tcp.start().await?;
        self.udp.start().await?;

        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(self.clone().spawn_cleanup_timer());
        tasks.push(self.clone().spawn_routing_timer());
        Ok(())
    }

    pub async fn stop(&self) {
        self.tcp.stop().await;
        self.udp.stop().await;
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }

    fn spawn_cleanup_timer(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.cleanup_interval);
            loop {
                ticker.tick().await;
                let now = DtnTime::now();
                let expired = self.store.cleanup(now);
                let abandoned = self.reassembly.cleanup(now);
                if expired > 0 || abandoned > 0 {
                    debug!(expired, abandoned, "periodic cleanup swept stale state");
                }
            }
        })
    }

    fn spawn_routing_timer(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.routing_interval);
            loop {
                ticker.tick().await;
                let sent = self.strategy.dispatch_bundles(self.as_ref()).await;
                if sent > 0 {
                    trace!(sent, "routing dispatch tick");
                }
            }
        })
    }
}

#[async_trait]
impl Sender for Node {
    async fn send(&self, bundle: &Bundle, endpoint: &EndpointAddress) -> bool {
        match endpoint {
            EndpointAddress::Tcp(_) => self.tcp.send(bundle, endpoint).await,
            EndpointAddress::Udp(_) => self.udp.send(bundle, endpoint).await,
        }
    }

    async fn is_endpoint_reachable(&self, endpoint: &EndpointAddress) -> bool {
        match endpoint {
            EndpointAddress::Tcp(_) => self.tcp.is_endpoint_reachable(endpoint).await,
            EndpointAddress::Udp(_) => self.udp.is_endpoint_reachable(endpoint).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp7::builder::Builder;
    use bp7_routing::Epidemic;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn node_with(local_eid: Eid) -> Arc<Node> {
        let config = Config::new(local_eid);
        Node::new(config, Arc::new(Epidemic::new()))
    }

    #[test]
    fn submit_splits_oversized_bundles_before_routing() {
        let node = node_with(Eid::ipn(1, 0));
        let payload: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let bundle = Builder::new(Eid::ipn(2, 1), Eid::ipn(1, 0))
            .payload(payload)
            .build()
            .unwrap();
        assert!(node.submit(bundle));
        assert!(node.store.len() >= 1);
    }

    #[test]
    fn inbound_bundle_for_local_endpoint_is_delivered_not_relayed() {
        let local = Eid::ipn(1, 0);
        let node = node_with(local.clone());
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        node.set_delivery_callback(Arc::new(move |_bundle| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let bundle = Builder::new(local, Eid::ipn(2, 1))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        node.handle_inbound(bundle, None);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert_eq!(node.store.len(), 0);
    }

    #[test]
    fn inbound_bundle_for_remote_endpoint_is_stored_and_routed() {
        let node = node_with(Eid::ipn(1, 0));
        let bundle = Builder::new(Eid::ipn(9, 1), Eid::ipn(2, 0))
            .payload(b"hi".to_vec())
            .build()
            .unwrap();
        node.handle_inbound(bundle, None);
        assert_eq!(node.store.len(), 1);
    }
}
