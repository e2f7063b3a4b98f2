pub mod arch;
pub mod builder;
pub mod components;
pub mod topology;

#[cfg(test)]
mod unit_tests;

pub use arch::{Architecture, CoreVariant};
pub use builder::{ClusterTopologyBuilder, CoreWiring, FpDispatch, SocEndpoints};
pub use topology::{ClusterTopology, Entry, Resolution, Terminal};
