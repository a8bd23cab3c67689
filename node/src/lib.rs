//! Orchestrates a running BPv7 node: wires the bundle store, fragmentation
//! manager, a routing strategy, and the TCP/UDP convergence layers together,
//! driving them from periodic timers the way a deployed node would.

pub mod config;
pub mod node;

pub use config::Config;
pub use node::{DeliveryCallback, Node};
