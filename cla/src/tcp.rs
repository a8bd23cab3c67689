//! TCP convergence layer: each transmission is a 4-byte big-endian length
//! prefix followed by the CBOR-encoded bundle.

use crate::contract::{BundleCallback, EndpointAddress, Receiver, Sender};
use async_trait::async_trait;
use bp7::bundle::Bundle;
use bp7_cbor::decode::FromCbor;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace, warn};

/// Tunables for [`TcpCla`] (defaults match the core configuration table).
#[derive(Debug, Clone)]
pub struct Config {
    pub local_port: u16,
    /// Whether outbound connections are kept open and reused (`true`) or
    /// closed after each send (`false`).
    pub permanent_connections: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_port: 4556,
            permanent_connections: false,
        }
    }
}

async fn write_framed(stream: &mut TcpStream, bytes: &[u8]) -> std::io::Result<()> {
    stream.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    stream.write_all(bytes).await
}

async fn read_framed(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// TCP convergence-layer adapter. Connections are either ephemeral (opened
/// and closed per send) or kept in the connection map for reuse, per
/// [`Config::permanent_connections`].
pub struct TcpCla {
    config: Config,
    callback: Mutex<Option<BundleCallback>>,
    connections: tokio::sync::Mutex<HashMap<SocketAddr, TcpStream>>,
    listener_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    self_ref: OnceLock<Weak<TcpCla>>,
}

impl TcpCla {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let this = Self {
                config,
                callback: Mutex::new(None),
                connections: tokio::sync::Mutex::new(HashMap::new()),
                listener_task: Mutex::new(None),
                self_ref: OnceLock::new(),
            };
            let _ = this.self_ref.set(weak.clone());
            this
        })
    }

    async fn send_ephemeral(&self, addr: SocketAddr, bytes: &[u8]) -> bool {
        match TcpStream::connect(addr).await {
            Ok(mut stream) => write_framed(&mut stream, bytes).await.is_ok(),
            Err(e) => {
                trace!(%addr, error = %e, "tcp connect failed");
                false
            }
        }
    }

    async fn send_permanent(&self, addr: SocketAddr, bytes: &[u8]) -> bool {
        let mut connections = self.connections.lock().await;
        if let Some(stream) = connections.get_mut(&addr) {
            if write_framed(stream, bytes).await.is_ok() {
                return true;
            }
            connections.remove(&addr);
        }
        match TcpStream::connect(addr).await {
            Ok(mut stream) => {
                let ok = write_framed(&mut stream, bytes).await.is_ok();
                if ok {
                    connections.insert(addr, stream);
                }
                ok
            }
            Err(e) => {
                trace!(%addr, error = %e, "tcp connect failed");
                false
            }
        }
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "tcp accept failed");
                    continue;
                }
            };
            let this = self.clone();
            tokio::spawn(async move {
                loop {
                    match read_framed(&mut stream).await {
                        Ok(bytes) => match Bundle::from_cbor(&bytes) {
                            Ok((bundle, _, _)) => {
                                if let Some(cb) = this.callback.lock().unwrap().as_ref() {
                                    cb(bundle, None);
                                }
                            }
                            Err(e) => {
                                debug!(%peer, error = %e, "dropping malformed inbound bundle");
                            }
                        },
                        Err(_) => break,
                    }
                    if !this.config.permanent_connections {
                        break;
                    }
                }
            });
        }
    }
}

#[async_trait]
impl Sender for TcpCla {
    async fn send(&self, bundle: &Bundle, endpoint: &EndpointAddress) -> bool {
        let EndpointAddress::Tcp(addr) = endpoint else {
            return false;
        };
        let bytes = bundle.emit();
        if self.config.permanent_connections {
            self.send_permanent(*addr, &bytes).await
        } else {
            self.send_ephemeral(*addr, &bytes).await
        }
    }

    async fn is_endpoint_reachable(&self, endpoint: &EndpointAddress) -> bool {
        matches!(endpoint, EndpointAddress::Tcp(_))
    }
}

#[async_trait]
impl Receiver for TcpCla {
    fn set_callback(&self, callback: BundleCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    async fn start(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.local_port)).await?;
        let Some(this) = self.self_ref.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        let handle = tokio::spawn(this.accept_loop(listener));
        *self.listener_task.lock().unwrap() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(handle) = self.listener_task.lock().unwrap().take() {
            handle.abort();
        }
        self.connections.lock().await.clear();
    }

    fn local_address(&self) -> EndpointAddress {
        EndpointAddress::Tcp(SocketAddr::from(([0, 0, 0, 0], self.config.local_port)))
    }
}
