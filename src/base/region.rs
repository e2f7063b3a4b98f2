use std::fmt;

use serde::Serialize;

use crate::base::error::TopologyError;

/// Immutable `[base, base + size)` address window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AddressRegion {
    base: u64,
    size: u64,
}

impl AddressRegion {
    /// Build a region, rejecting zero-sized windows and windows that run past the end of the
    /// 64-bit address space.
    pub fn new(base: u64, size: u64) -> Result<Self, TopologyError> {
        if size == 0 {
            return Err(TopologyError::InvalidRegion {
                base,
                size,
                reason: "size must be non-zero",
            });
        }
        if base.checked_add(size).is_none() {
            return Err(TopologyError::InvalidRegion {
                base,
                size,
                reason: "region wraps the address space",
            });
        }
        Ok(Self { base, size })
    }

    /// Region starting `offset` bytes above `origin`.
    pub fn at_offset(origin: u64, offset: u64, size: u64) -> Result<Self, TopologyError> {
        let base = origin.checked_add(offset).ok_or(TopologyError::InvalidRegion {
            base: origin,
            size,
            reason: "offset overflows the region origin",
        })?;
        Self::new(base, size)
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Exclusive end address.
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Whether the whole access `[addr, addr + size)` lies inside the region. A zero-sized
    /// access is treated as a single byte.
    pub fn contains_span(&self, addr: u64, size: u64) -> bool {
        match addr.checked_add(size.max(1)) {
            Some(end) => addr >= self.base && end <= self.end(),
            None => false,
        }
    }

    pub fn overlaps(&self, other: &AddressRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Offset of `addr` from the region base. Caller guarantees `addr` is inside.
    pub fn offset_of(&self, addr: u64) -> u64 {
        addr - self.base
    }
}

impl fmt::Display for AddressRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010x}, {:#010x})", self.base, self.end())
    }
}
