//! UDP convergence layer: single datagrams carry a `0xBB` marker byte, while
//! bundles too large for one datagram are split across several, each
//! prefixed by a small fragment header. This per-datagram split is purely a
//! transport-level convenience — its bundle-id counter is a locally
//! assigned 32-bit value, never the BP Bundle ID, and is discarded once
//! reassembly hands a whole bundle up to routing.

use crate::contract::{BundleCallback, EndpointAddress, Receiver, Sender};
use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7_cbor::decode::FromCbor;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

const SINGLE_DATAGRAM_MARKER: u8 = 0xBB;
const FRAGMENT_MARKER: u8 = 0x1B;
const FRAGMENT_HEADER_LEN: usize = 1 + 4 + 2 + 1;
const MAX_DATAGRAM: usize = 65507;

#[derive(Debug, Clone)]
pub struct Config {
    pub local_port: u16,
    /// Period between sweeps that expire stale reassembly state.
    pub cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_port: 4557,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

struct Pending {
    fragment_count: u8,
    fragments: HashMap<u16, Vec<u8>>,
    last_seen: Instant,
}

/// UDP convergence-layer adapter.
pub struct UdpCla {
    config: Config,
    callback: Mutex<Option<BundleCallback>>,
    socket: OnceLock<Arc<UdpSocket>>,
    next_local_id: AtomicU32,
    pending: tokio::sync::Mutex<HashMap<(SocketAddr, u32), Pending>>,
    recv_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    cleanup_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    self_ref: OnceLock<Weak<UdpCla>>,
}

impl UdpCla {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let this = Self {
                config,
                callback: Mutex::new(None),
                socket: OnceLock::new(),
                next_local_id: AtomicU32::new(0),
                pending: tokio::sync::Mutex::new(HashMap::new()),
                recv_task: Mutex::new(None),
                cleanup_task: Mutex::new(None),
                self_ref: OnceLock::new(),
            };
            let _ = this.self_ref.set(weak.clone());
            this
        })
    }

    async fn send_datagrams(&self, socket: &UdpSocket, addr: SocketAddr, bytes: &[u8]) -> bool {
        if bytes.len() <= MAX_DATAGRAM - 1 {
            let mut datagram = Vec::with_capacity(bytes.len() + 1);
            datagram.push(SINGLE_DATAGRAM_MARKER);
            datagram.extend_from_slice(bytes);
            return socket.send_to(&datagram, addr).await.is_ok();
        }

        let chunk_size = MAX_DATAGRAM - FRAGMENT_HEADER_LEN;
        let fragment_count = bytes.len().div_ceil(chunk_size);
        if fragment_count > u8::MAX as usize {
            warn!(len = bytes.len(), "bundle too large to fragment over udp");
            return false;
        }
        let bundle_id = self.next_local_id.fetch_add(1, Ordering::Relaxed);

        for (index, chunk) in bytes.chunks(chunk_size).enumerate() {
            let mut datagram = Vec::with_capacity(FRAGMENT_HEADER_LEN + chunk.len());
            datagram.push(FRAGMENT_MARKER);
            datagram.extend_from_slice(&bundle_id.to_be_bytes());
            datagram.extend_from_slice(&(index as u16).to_be_bytes());
            datagram.push(fragment_count as u8);
            datagram.extend_from_slice(chunk);
            if socket.send_to(&datagram, addr).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn handle_datagram(&self, data: &[u8], peer: SocketAddr) {
        let Some((&marker, rest)) = data.split_first() else {
            return;
        };
        match marker {
            SINGLE_DATAGRAM_MARKER => self.deliver(rest, peer),
            FRAGMENT_MARKER => self.handle_fragment(rest, peer).await,
            other => trace!(marker = other, %peer, "unrecognised udp datagram marker"),
        }
    }

    async fn handle_fragment(&self, rest: &[u8], peer: SocketAddr) {
        if rest.len() < FRAGMENT_HEADER_LEN - 1 {
            return;
        }
        let bundle_id = u32::from_be_bytes(rest[0..4].try_into().unwrap());
        let index = u16::from_be_bytes(rest[4..6].try_into().unwrap());
        let fragment_count = rest[6];
        let chunk = rest[7..].to_vec();

        let mut pending = self.pending.lock().await;
        let key = (peer, bundle_id);
        let entry = pending.entry(key).or_insert_with(|| Pending {
            fragment_count,
            fragments: HashMap::new(),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.fragments.insert(index, chunk);

        if entry.fragments.len() == entry.fragment_count as usize {
            let entry = pending.remove(&key).unwrap();
            drop(pending);
            let mut bytes = Vec::new();
            for i in 0..entry.fragment_count as u16 {
                match entry.fragments.get(&i) {
                    Some(chunk) => bytes.extend_from_slice(chunk),
                    None => return,
                }
            }
            self.deliver(&bytes, peer);
        }
    }

    fn deliver(&self, bytes: &[u8], peer: SocketAddr) {
        match Bundle::from_cbor(bytes) {
            Ok((bundle, _, _)) => {
                if let Some(cb) = self.callback.lock().unwrap().as_ref() {
                    cb(bundle, None);
                }
            }
            Err(e) => debug!(%peer, error = %e, "dropping malformed inbound bundle"),
        }
    }

    async fn recv_loop(self: Arc<Self>, socket: Arc<UdpSocket>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => self.handle_datagram(&buf[..len], peer).await,
                Err(e) => warn!(error = %e, "udp recv failed"),
            }
        }
    }

    async fn cleanup_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        loop {
            ticker.tick().await;
            let cutoff = Instant::now() - self.config.cleanup_interval;
            let mut pending = self.pending.lock().await;
            let before = pending.len();
            pending.retain(|_, p| p.last_seen >= cutoff);
            let removed = before - pending.len();
            if removed > 0 {
                debug!(removed, "expired stale udp reassembly state");
            }
        }
    }
}

#[async_trait]
impl Sender for UdpCla {
    async fn send(&self, bundle: &Bundle, endpoint: &EndpointAddress) -> bool {
        let EndpointAddress::Udp(addr) = endpoint else {
            return false;
        };
        let Some(socket) = self.socket.get() else {
            return false;
        };
        self.send_datagrams(socket, *addr, &bundle.emit()).await
    }

    async fn is_endpoint_reachable(&self, endpoint: &EndpointAddress) -> bool {
        matches!(endpoint, EndpointAddress::Udp(_))
    }
}

#[async_trait]
impl Receiver for UdpCla {
    fn set_callback(&self, callback: BundleCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    async fn start(&self) -> std::io::Result<()> {
        let socket = Arc::new(UdpSocket::bind(("0.0.0.0", self.config.local_port)).await?);
        let _ = self.socket.set(socket.clone());
        let Some(this) = self.self_ref.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        *self.recv_task.lock().unwrap() = Some(tokio::spawn(this.clone().recv_loop(socket)));
        *self.cleanup_task.lock().unwrap() = Some(tokio::spawn(this.cleanup_loop()));
        Ok(())
    }

    async fn stop(&self) {
        if let Some(handle) = self.recv_task.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.cleanup_task.lock().unwrap().take() {
            handle.abort();
        }
        self.pending.lock().await.clear();
    }

    fn local_address(&self) -> EndpointAddress {
        EndpointAddress::Udp(SocketAddr::from(([0, 0, 0, 0], self.config.local_port)))
    }
}
