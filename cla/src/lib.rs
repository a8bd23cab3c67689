//! The convergence-layer contract: the `Sender`/`Receiver` surface routing
//! drives, plus the TCP and UDP transports this core relies on.

pub mod contract;
pub mod tcp;
pub mod udp;

pub use contract::{ConvergenceLayer, EndpointAddress, Receiver, Sender};
