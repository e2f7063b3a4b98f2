pub mod graph;
pub mod interleaver;
pub mod router;
pub mod tcdm;
pub mod types;

#[cfg(test)]
mod unit_tests;

pub use graph::{AddressFilter, Binding, BindingGraph, ComponentNode};
pub use interleaver::{BankChunk, BankInterleaver, BankSlot, DmaBankInterleaver, InterleaveMap};
pub use router::{Mapping, RouteDecision, Router};
pub use tcdm::{MemoryBank, TcdmGeometry, TcdmPath, TcdmSubsystem};
pub use types::{BindingId, ComponentId, ComponentKind, PortRef};
