use thiserror::Error;

use crate::base::region::AddressRegion;

/// Errors raised while assembling a cluster or resolving an access through it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Malformed or contradictory architecture parameters.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("invalid region base={base:#x} size={size:#x}: {reason}")]
    InvalidRegion {
        base: u64,
        size: u64,
        reason: &'static str,
    },

    #[error("router '{router}': mapping {new} overlaps {existing} and is not a fallback")]
    RegionOverlap {
        router: String,
        existing: AddressRegion,
        new: AddressRegion,
    },

    #[error("component '{component}' has no port '{port}'")]
    UnknownPort { component: String, port: String },

    /// A functional read resolved to a target whose contents live in the simulator.
    #[error("read at {address:#x} resolved to {terminal}, which holds no data here")]
    NoBackingData { terminal: String, address: u64 },

    /// A simulated access matched no mapping. Faults the access, not the simulation.
    #[error("unroutable access at {address:#x} (+{size}) in '{router}'")]
    UnroutableAccess {
        router: String,
        address: u64,
        size: u64,
    },
}

impl TopologyError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        TopologyError::Configuration {
            reason: reason.into(),
        }
    }

    pub fn unroutable(router: impl Into<String>, address: u64, size: u64) -> Self {
        TopologyError::UnroutableAccess {
            router: router.into(),
            address,
            size,
        }
    }

    /// Configuration errors abort construction; everything else faults a single access.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            TopologyError::UnroutableAccess { .. } | TopologyError::NoBackingData { .. }
        )
    }
}

pub type TopologyResult<T> = Result<T, TopologyError>;
