//! Leaf components of the cluster. Their internal behaviour belongs to the simulator; here
//! they carry their parameters and the ports the builder binds against.

use serde::Serialize;

use crate::base::{AddressRegion, TopologyError, TopologyResult};
use crate::cluster::arch::{IRQ_EXTERNAL, IRQ_SOFTWARE, IRQ_TIMER};
use crate::fabric::types::indexed;

/// Reads as zero, discards writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZeroMemory {
    pub size: u64,
}

impl ZeroMemory {
    pub const PORTS: [&'static str; 1] = ["input"];

    pub fn new(size: u64) -> Self {
        Self { size }
    }

    /// Bounds check for an access of `len` bytes at `offset`.
    pub fn check(&self, offset: u64, len: usize) -> TopologyResult<()> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(TopologyError::unroutable("zero_mem", offset, len as u64)),
        }
    }

    pub fn read(&self, offset: u64, len: usize) -> TopologyResult<Vec<u8>> {
        self.check(offset, len)?;
        Ok(vec![0; len])
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> TopologyResult<()> {
        self.check(offset, data.len())
    }
}

/// Shared instruction cache: one fetch input per core, one refill port towards the wide bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HierarchicalCache {
    pub nb_cores: usize,
    pub has_cc: bool,
    pub l1_line_size_bits: u32,
}

impl HierarchicalCache {
    pub const L1_LINE_SIZE_BITS: u32 = 7;

    pub fn new(nb_cores: usize) -> Self {
        Self {
            nb_cores,
            has_cc: false,
            l1_line_size_bits: Self::L1_LINE_SIZE_BITS,
        }
    }

    pub fn line_bytes(&self) -> u64 {
        1 << self.l1_line_size_bits
    }

    /// Line-aligned address a refill for `pc` requests.
    pub fn refill_address(&self, pc: u64) -> u64 {
        pc & !(self.line_bytes() - 1)
    }

    pub fn ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = (0..self.nb_cores).map(|i| indexed("input", i)).collect();
        ports.extend(["flush", "flush_ack", "refill"].map(String::from));
        ports
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistersFlavor {
    Standard,
    Spatz,
}

/// Barrier and interrupt-control peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterRegisters {
    pub nb_cores: usize,
    pub boot_addr: u64,
    pub flavor: RegistersFlavor,
}

impl ClusterRegisters {
    pub fn new(nb_cores: usize, boot_addr: u64, flavor: RegistersFlavor) -> Self {
        Self {
            nb_cores,
            boot_addr,
            flavor,
        }
    }

    pub fn ports(&self) -> Vec<String> {
        let mut ports = vec!["input".to_string(), "barrier_ack".to_string()];
        for core in 0..self.nb_cores {
            ports.push(indexed("barrier_req", core));
            ports.push(indexed("external_irq", core));
        }
        ports
    }
}

/// Side of a DMA transfer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DmaEndpoint {
    /// Inside the TCDM window; offset from its base.
    Local { offset: u64 },
    Remote { address: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DmaDirection {
    BusToTcdm,
    TcdmToBus,
    TcdmToTcdm,
    BusToBus,
}

/// Offload DMA anchored at the TCDM window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DmaEngine {
    pub local: AddressRegion,
    pub tcdm_width: u64,
    pub transfer_queue_size: usize,
    pub burst_queue_size: usize,
}

impl DmaEngine {
    pub const TCDM_WIDTH: u64 = 4096;
    pub const TRANSFER_QUEUE_SIZE: usize = 8;
    pub const BURST_QUEUE_SIZE: usize = 24;
    pub const PORTS: [&'static str; 4] = ["offload", "offload_grant", "axi", "tcdm"];

    pub fn new(local: AddressRegion) -> Self {
        Self {
            local,
            tcdm_width: Self::TCDM_WIDTH,
            transfer_queue_size: Self::TRANSFER_QUEUE_SIZE,
            burst_queue_size: Self::BURST_QUEUE_SIZE,
        }
    }

    /// A span straddling the TCDM window boundary faults.
    pub fn classify(&self, address: u64, size: u64) -> TopologyResult<DmaEndpoint> {
        if self.local.contains_span(address, size) {
            return Ok(DmaEndpoint::Local {
                offset: self.local.offset_of(address),
            });
        }
        let end = address.saturating_add(size.max(1));
        let touches_local = address < self.local.end() && end > self.local.base();
        if touches_local {
            return Err(TopologyError::unroutable("idma", address, size));
        }
        Ok(DmaEndpoint::Remote { address })
    }

    pub fn plan(&self, src: u64, dst: u64, size: u64) -> TopologyResult<DmaDirection> {
        let direction = match (self.classify(src, size)?, self.classify(dst, size)?) {
            (DmaEndpoint::Remote { .. }, DmaEndpoint::Local { .. }) => DmaDirection::BusToTcdm,
            (DmaEndpoint::Local { .. }, DmaEndpoint::Remote { .. }) => DmaDirection::TcdmToBus,
            (DmaEndpoint::Local { .. }, DmaEndpoint::Local { .. }) => DmaDirection::TcdmToTcdm,
            (DmaEndpoint::Remote { .. }, DmaEndpoint::Remote { .. }) => DmaDirection::BusToBus,
        };
        Ok(direction)
    }
}

/// Integer core model, picked from the core variant and vector-extension flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreModel {
    Snitch,
    SnitchFast { spatz: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Core {
    pub model: CoreModel,
    pub hart_id: usize,
    pub isa: String,
    pub boot_addr: u64,
    pub fetch_enable: bool,
}

impl Core {
    pub const SSR_PORTS: [&'static str; 3] = ["ssr_dm0", "ssr_dm1", "ssr_dm2"];

    pub fn ports(barrier_irq: u32) -> Vec<String> {
        let mut ports: Vec<String> = [
            "data",
            "fetch",
            "fetchen",
            "flush_cache",
            "flush_cache_ack",
            "barrier_req",
            "barrier_ack",
            "offload",
            "offload_grant",
            "acc_req",
            "acc_req_ready",
            "acc_rsp",
        ]
        .map(String::from)
        .to_vec();
        ports.extend(Self::SSR_PORTS.map(String::from));
        for line in [IRQ_SOFTWARE, IRQ_TIMER, IRQ_EXTERNAL, barrier_irq] {
            ports.push(indexed("irq", line as usize));
        }
        ports
    }
}

/// Floating-point companion of an accurate integer core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FpSubsystem {
    pub hart_id: usize,
    pub isa: String,
    pub boot_addr: u64,
    pub fetch_enable: bool,
}

impl FpSubsystem {
    pub fn ports() -> Vec<String> {
        let mut ports: Vec<String> = ["data", "fetchen", "acc_req", "acc_req_ready", "acc_rsp"]
            .map(String::from)
            .to_vec();
        ports.extend(Core::SSR_PORTS.map(String::from));
        ports
    }
}

/// Instruction buffer between an integer core and its FP subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sequencer {
    pub latency: u64,
}

impl Sequencer {
    pub const PORTS: [&'static str; 4] = ["input", "output", "acc_req_ready", "acc_req_ready_o"];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dma() -> DmaEngine {
        DmaEngine::new(AddressRegion::new(0x1000_0000, 0x2_0000).unwrap())
    }

    #[test]
    fn dma_uses_fixed_queue_depths() {
        let dma = dma();
        assert_eq!(8, dma.transfer_queue_size);
        assert_eq!(24, dma.burst_queue_size);
    }

    #[test]
    fn dma_classifies_endpoints() {
        let dma = dma();
        assert_eq!(
            DmaEndpoint::Local { offset: 0x40 },
            dma.classify(0x1000_0040, 64).unwrap()
        );
        assert_eq!(
            DmaEndpoint::Remote { address: 0x8000_0000 },
            dma.classify(0x8000_0000, 64).unwrap()
        );
        assert!(dma.classify(0x1001_fff0, 0x20).is_err());
    }

    #[test]
    fn dma_plans_direction() {
        let dma = dma();
        assert_eq!(
            DmaDirection::BusToTcdm,
            dma.plan(0x8000_0000, 0x1000_0000, 256).unwrap()
        );
        assert_eq!(
            DmaDirection::TcdmToBus,
            dma.plan(0x1000_0000, 0x8000_0000, 256).unwrap()
        );
        assert_eq!(
            DmaDirection::TcdmToTcdm,
            dma.plan(0x1000_0000, 0x1000_1000, 256).unwrap()
        );
    }

    #[test]
    fn zero_memory_reads_zero_and_bounds_checks() {
        let zero = ZeroMemory::new(0x100);
        assert_eq!(vec![0u8; 8], zero.read(0xf8, 8).unwrap());
        assert!(zero.read(0xfc, 8).is_err());
        zero.write(0, &[1, 2, 3]).unwrap();
        assert_eq!(vec![0u8; 3], zero.read(0, 3).unwrap());
    }

    #[test]
    fn icache_refills_whole_lines() {
        let icache = HierarchicalCache::new(2);
        assert_eq!(128, icache.line_bytes());
        assert_eq!(0x8000_0080, icache.refill_address(0x8000_00c4));
        assert_eq!(5, icache.ports().len());
    }

    #[test]
    fn core_ports_cover_every_interrupt_line() {
        let ports = Core::ports(19);
        for line in ["irq_3", "irq_7", "irq_11", "irq_19"] {
            assert!(ports.iter().any(|p| p == line));
        }
    }
}
