//! The shared contract every routing strategy implements, plus the
//! filtering and forwarding steps common to all of them.

use crate::descriptor::DescriptorTable;
use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7::dtn_time::DtnTime;
use bp7::eid::Eid;
use bp7_cla::{EndpointAddress, Sender};
use std::sync::Arc;
use tracing::trace;

/// Where a bundle handed to [`Strategy::notify_new_bundle`] came from: a
/// local application submission, or a peer relaying it onward. Strategies
/// that size an initial copy budget (spray-and-wait) need this distinction;
/// it is never carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Relayed,
}

/// A routing strategy: decides which peers a bundle is offered to, and in
/// what order, given the current peer and bundle population.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Records this node's own endpoint identity. Must be called before any
    /// other method observes sensible results.
    fn initialize(&self, local_eid: Eid);

    fn notify_new_bundle(&self, bundle: Arc<Bundle>, origin: Origin);

    fn notify_peer_appeared(&self, peer: Eid, endpoint: EndpointAddress);

    fn notify_peer_disappeared(&self, peer: Eid);

    /// Offers every eligible bundle to every eligible peer, once, per the
    /// strategy's own policy. Returns the number of bundles successfully
    /// handed to `sender`.
    async fn dispatch_bundles(&self, sender: &dyn Sender) -> usize;
}

/// The filters every strategy applies before its own policy runs: a bundle
/// already past its expiry, already at its destination, or already offered
/// to this particular peer is never a candidate again.
pub(crate) fn eligible(
    bundle: &Bundle,
    local_eid: &Eid,
    peer: &Eid,
    descriptors: &DescriptorTable,
    now: DtnTime,
) -> bool {
    if bundle.expiry() < now {
        return false;
    }
    if &bundle.primary.destination == local_eid {
        return false;
    }
    !descriptors.already_sent_to(&bundle.id(), peer)
}

/// Stamps the previous-node block with this node's identity, attempts the
/// send, and on success records it against the descriptor table and emits a
/// trace. Returns whether the send succeeded.
pub(crate) async fn forward_to(
    sender: &dyn Sender,
    local_eid: &Eid,
    bundle: &Bundle,
    peer: &Eid,
    endpoint: &EndpointAddress,
    descriptors: &DescriptorTable,
) -> bool {
    let mut outgoing = bundle.clone();
    outgoing.set_previous_node(local_eid);
    let ok = sender.send(&outgoing, endpoint).await;
    if ok {
        descriptors.record_sent(&bundle.id(), peer.clone());
        trace!(id = %bundle.id(), %peer, "bundle sent");
    }
    ok
}
