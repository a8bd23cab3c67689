//! Routing strategies that decide which peers a bundle is offered to:
//! epidemic flooding and binary spray-and-wait, behind a shared
//! [`Strategy`] contract driven by a convergence layer's [`bp7_cla::Sender`].

pub mod contract;
pub mod descriptor;
pub mod epidemic;
pub mod peer;
pub mod spray;

pub use contract::{Origin, Strategy};
pub use descriptor::{DescriptorTable, State as DescriptorState};
pub use epidemic::Epidemic;
pub use peer::PeerTable;
pub use spray::{Config as SprayConfig, SprayAndWait};
