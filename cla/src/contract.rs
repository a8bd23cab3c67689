//! The roles a convergence layer plays from routing's point of view.

use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7::eid::Eid;
use std::net::SocketAddr;
use std::sync::Arc;

/// Where a `Sender` delivers a bundle, or where a `Receiver` listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointAddress {
    Tcp(SocketAddr),
    Udp(SocketAddr),
}

/// Invoked once per successfully decoded inbound bundle, with the peer it
/// arrived from (best-effort; `None` when the transport cannot name a peer).
pub type BundleCallback = Arc<dyn Fn(Bundle, Option<Eid>) + Send + Sync>;

/// Transmits bundles to a peer address. Reachability is a hint only —
/// `send` may still fail and must report that rather than panic or block
/// indefinitely.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, bundle: &Bundle, endpoint: &EndpointAddress) -> bool;
    async fn is_endpoint_reachable(&self, endpoint: &EndpointAddress) -> bool;
}

/// Accepts inbound bundles and hands each one to a registered callback.
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Registers the callback invoked for every decoded inbound bundle.
    /// Must be called before [`Receiver::start`].
    fn set_callback(&self, callback: BundleCallback);

    async fn start(&self) -> std::io::Result<()>;
    async fn stop(&self);

    fn local_address(&self) -> EndpointAddress;
}

/// A transport that is both a [`Sender`] and a [`Receiver`].
pub trait ConvergenceLayer: Sender + Receiver {}
impl<T: Sender + Receiver> ConvergenceLayer for T {}
