use log::debug;
use serde::Serialize;

use crate::base::{AddressRegion, TopologyError, TopologyResult};
use crate::fabric::types::PortRef;

#[derive(Debug, Clone, Serialize)]
pub struct Mapping {
    pub region: AddressRegion,
    pub destination: PortRef,
    pub rebase: bool,
    /// A fallback may shadow part of an earlier mapping; first match still wins.
    pub fallback: bool,
}

/// Outcome of one routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision<'a> {
    pub destination: &'a PortRef,
    /// Address forwarded to the destination, after rebasing.
    pub address: u64,
    /// Index of the matching mapping, `None` for the default output.
    pub mapping: Option<usize>,
}

/// Address-decoding dispatcher. Mappings are tried in registration order; the default
/// output, if any, is consulted only after every mapping missed.
#[derive(Debug, Clone, Serialize)]
pub struct Router {
    name: String,
    bandwidth: u32,
    mappings: Vec<Mapping>,
    default: Option<PortRef>,
}

impl Router {
    pub fn new(name: impl Into<String>, bandwidth: u32) -> Self {
        Self {
            name: name.into(),
            bandwidth,
            mappings: Vec::new(),
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes per cycle.
    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn default_output(&self) -> Option<&PortRef> {
        self.default.as_ref()
    }

    fn insert(
        &mut self,
        region: AddressRegion,
        destination: PortRef,
        rebase: bool,
        fallback: bool,
    ) -> TopologyResult<()> {
        if !fallback {
            if let Some(existing) = self.mappings.iter().find(|m| m.region.overlaps(&region)) {
                return Err(TopologyError::RegionOverlap {
                    router: self.name.clone(),
                    existing: existing.region,
                    new: region,
                });
            }
        }
        debug!(
            "{}: map {} -> {} (rebase={}, fallback={})",
            self.name, region, destination, rebase, fallback
        );
        self.mappings.push(Mapping {
            region,
            destination,
            rebase,
            fallback,
        });
        Ok(())
    }

    /// Register `region -> destination`. Fails if the region overlaps any earlier mapping.
    pub fn add_mapping(
        &mut self,
        region: AddressRegion,
        destination: PortRef,
        rebase: bool,
    ) -> TopologyResult<()> {
        self.insert(region, destination, rebase, false)
    }

    /// Register a lower-priority mapping that may overlap earlier ones. Later non-fallback
    /// mappings still may not overlap it.
    pub fn add_fallback_mapping(
        &mut self,
        region: AddressRegion,
        destination: PortRef,
        rebase: bool,
    ) -> TopologyResult<()> {
        self.insert(region, destination, rebase, true)
    }

    /// Output for accesses no mapping claims. Never rebases.
    pub fn set_default(&mut self, destination: PortRef) -> TopologyResult<()> {
        if let Some(existing) = &self.default {
            return Err(TopologyError::configuration(format!(
                "router '{}' already has a default output {}",
                self.name, existing
            )));
        }
        debug!("{}: default -> {}", self.name, destination);
        self.default = Some(destination);
        Ok(())
    }

    /// Decide where the access `[address, address + size)` goes.
    pub fn route(&self, address: u64, size: u64) -> TopologyResult<RouteDecision<'_>> {
        for (idx, mapping) in self.mappings.iter().enumerate() {
            if mapping.region.contains_span(address, size) {
                let address = if mapping.rebase {
                    mapping.region.offset_of(address)
                } else {
                    address
                };
                return Ok(RouteDecision {
                    destination: &mapping.destination,
                    address,
                    mapping: Some(idx),
                });
            }
        }
        match &self.default {
            Some(destination) => Ok(RouteDecision {
                destination,
                address,
                mapping: None,
            }),
            None => Err(TopologyError::unroutable(&self.name, address, size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: u64, size: u64) -> AddressRegion {
        AddressRegion::new(base, size).unwrap()
    }

    #[test]
    fn rebase_strips_region_base() {
        let mut router = Router::new("r", 8);
        router
            .add_mapping(region(0x1000, 0x100), PortRef::new(1, "input"), true)
            .unwrap();
        router
            .add_mapping(region(0x2000, 0x100), PortRef::new(2, "input"), false)
            .unwrap();

        let d = router.route(0x1010, 4).unwrap();
        assert_eq!(0x10, d.address);
        assert_eq!(&PortRef::new(1, "input"), d.destination);

        let d = router.route(0x2010, 4).unwrap();
        assert_eq!(0x2010, d.address);
        assert_eq!(Some(1), d.mapping);
    }

    #[test]
    fn default_is_consulted_last() {
        let mut router = Router::new("r", 8);
        router.set_default(PortRef::new(9, "soc")).unwrap();
        router
            .add_mapping(region(0x1000, 0x100), PortRef::new(1, "input"), true)
            .unwrap();

        assert_eq!(Some(0), router.route(0x1000, 1).unwrap().mapping);
        let d = router.route(0x5000, 1).unwrap();
        assert_eq!(None, d.mapping);
        assert_eq!(0x5000, d.address);
    }

    #[test]
    fn second_default_is_rejected() {
        let mut router = Router::new("r", 8);
        router.set_default(PortRef::new(9, "soc")).unwrap();
        let err = router.set_default(PortRef::new(8, "soc")).unwrap_err();
        assert!(err.is_configuration());
    }
}
