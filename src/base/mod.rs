pub mod error;
pub mod region;

pub use error::{TopologyError, TopologyResult};
pub use region::AddressRegion;
