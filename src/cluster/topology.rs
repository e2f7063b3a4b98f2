use log::{debug, trace};
use serde::Serialize;

use crate::base::{TopologyError, TopologyResult};
use crate::cluster::arch::{Architecture, IRQ_EXTERNAL, IRQ_SOFTWARE, IRQ_TIMER};
use crate::cluster::builder::CoreWiring;
use crate::cluster::components::{
    ClusterRegisters, Core, DmaEndpoint, DmaEngine, FpSubsystem, HierarchicalCache, Sequencer,
    ZeroMemory,
};
use crate::fabric::graph::BindingGraph;
use crate::fabric::interleaver::BankSlot;
use crate::fabric::router::Router;
use crate::fabric::tcdm::{TcdmPath, TcdmSubsystem};
use crate::fabric::types::{indexed, ComponentId, ComponentKind, PortRef};

/// Component and router indices of one assembled cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterHandles {
    pub cluster: ComponentId,
    pub soc: ComponentId,
    pub wide_axi: usize,
    pub narrow_axi: usize,
    pub tcdm_dma_ico: usize,
    pub core_icos: Vec<usize>,
    pub zero_mem: ComponentId,
    pub icache: ComponentId,
    pub registers: ComponentId,
    pub dma: ComponentId,
    pub cores: Vec<ComponentId>,
    pub fp_subsystems: Vec<ComponentId>,
    pub sequencers: Vec<ComponentId>,
}

/// Where an access is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    NarrowInput,
    WideInput,
    CoreData(usize),
    CoreFetch(usize),
    Dma,
}

/// Final target of a resolved access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Terminal {
    Tcdm { path: TcdmPath, slot: BankSlot },
    ZeroMemory { offset: u64 },
    Registers { offset: u64 },
    /// Left the cluster through a northbound port.
    Soc { port: String, address: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub terminal: Terminal,
    /// Routers and stateful components crossed, in order.
    pub hops: Vec<String>,
}

impl Terminal {
    pub fn describe(&self) -> String {
        match self {
            Terminal::Tcdm { slot, .. } => format!("tcdm bank {}", slot.bank),
            Terminal::ZeroMemory { .. } => "zero_mem".to_string(),
            Terminal::Registers { .. } => "cluster_registers".to_string(),
            Terminal::Soc { port, .. } => port.clone(),
        }
    }
}

impl Resolution {
    /// Bank an access landed in, if it reached the TCDM.
    pub fn bank(&self) -> Option<usize> {
        match &self.terminal {
            Terminal::Tcdm { slot, .. } => Some(slot.bank),
            _ => None,
        }
    }
}

/// An assembled cluster. Immutable once built; every accessor is a read.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterTopology {
    arch: Architecture,
    graph: BindingGraph<ComponentKind>,
    routers: Vec<Router>,
    tcdm: TcdmSubsystem,
    zero_mem: ZeroMemory,
    icache: HierarchicalCache,
    registers: ClusterRegisters,
    dma: DmaEngine,
    cores: Vec<Core>,
    fp_subsystems: Vec<FpSubsystem>,
    sequencers: Vec<Sequencer>,
    wiring: CoreWiring,
    handles: ClusterHandles,
}

impl ClusterTopology {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        arch: Architecture,
        graph: BindingGraph<ComponentKind>,
        routers: Vec<Router>,
        tcdm: TcdmSubsystem,
        zero_mem: ZeroMemory,
        icache: HierarchicalCache,
        registers: ClusterRegisters,
        dma: DmaEngine,
        cores: Vec<Core>,
        fp_subsystems: Vec<FpSubsystem>,
        sequencers: Vec<Sequencer>,
        wiring: CoreWiring,
        handles: ClusterHandles,
    ) -> Self {
        Self {
            arch,
            graph,
            routers,
            tcdm,
            zero_mem,
            icache,
            registers,
            dma,
            cores,
            fp_subsystems,
            sequencers,
            wiring,
            handles,
        }
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    pub fn graph(&self) -> &BindingGraph<ComponentKind> {
        &self.graph
    }

    pub fn signature(&self) -> Vec<(String, String, Option<crate::fabric::AddressFilter>)> {
        self.graph.signature()
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn router(&self, name: &str) -> Option<&Router> {
        self.routers.iter().find(|r| r.name() == name)
    }

    pub fn tcdm(&self) -> &TcdmSubsystem {
        &self.tcdm
    }

    pub fn zero_memory(&self) -> &ZeroMemory {
        &self.zero_mem
    }

    pub fn icache(&self) -> &HierarchicalCache {
        &self.icache
    }

    pub fn registers(&self) -> &ClusterRegisters {
        &self.registers
    }

    pub fn dma(&self) -> &DmaEngine {
        &self.dma
    }

    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    pub fn fp_subsystems(&self) -> &[FpSubsystem] {
        &self.fp_subsystems
    }

    pub fn sequencers(&self) -> &[Sequencer] {
        &self.sequencers
    }

    pub fn wiring(&self) -> CoreWiring {
        self.wiring
    }

    pub fn handles(&self) -> &ClusterHandles {
        &self.handles
    }

    // Boundary ports of the cluster component.

    pub fn wide_input(&self) -> PortRef {
        PortRef::new(self.handles.cluster, "wide_input")
    }

    pub fn wide_soc(&self) -> PortRef {
        PortRef::new(self.handles.cluster, "wide_soc")
    }

    pub fn narrow_input(&self) -> PortRef {
        PortRef::new(self.handles.cluster, "narrow_input")
    }

    pub fn narrow_soc(&self) -> PortRef {
        PortRef::new(self.handles.cluster, "narrow_soc")
    }

    pub fn fetchen(&self) -> PortRef {
        PortRef::new(self.handles.cluster, "fetchen")
    }

    pub fn meip(&self, core: usize) -> TopologyResult<PortRef> {
        self.graph.port(self.handles.cluster, &indexed("meip", core))
    }

    pub fn mtip(&self, core: usize) -> TopologyResult<PortRef> {
        self.graph.port(self.handles.cluster, &indexed("mtip", core))
    }

    pub fn msip(&self, core: usize) -> TopologyResult<PortRef> {
        self.graph.port(self.handles.cluster, &indexed("msip", core))
    }

    /// `(cluster port, core, interrupt line)` for every interrupt binding into the cores.
    pub fn interrupt_table(&self) -> Vec<(String, usize, u32)> {
        let lines = [
            IRQ_SOFTWARE,
            IRQ_TIMER,
            IRQ_EXTERNAL,
            self.arch.barrier_interrupt_line,
        ];
        let mut table = Vec::new();
        for (core_id, &core) in self.handles.cores.iter().enumerate() {
            for line in lines {
                let irq = PortRef::new(core, indexed("irq", line as usize));
                for binding in self.graph.bindings_to(&irq) {
                    table.push((self.graph.qualified(&binding.src), core_id, line));
                }
            }
        }
        table
    }

    fn core_port(&self, core: usize, port: &str) -> TopologyResult<PortRef> {
        match self.handles.cores.get(core) {
            Some(&id) => self.graph.port(id, port),
            None => Err(TopologyError::UnknownPort {
                component: indexed("pe", core),
                port: port.to_string(),
            }),
        }
    }

    /// Follow an access of `size` bytes at `address` from `entry` to its terminal.
    pub fn resolve(&self, entry: Entry, address: u64, size: u64) -> TopologyResult<Resolution> {
        let mut hops = Vec::new();
        let start = match entry {
            Entry::NarrowInput => self.narrow_input(),
            Entry::WideInput => self.wide_input(),
            Entry::CoreData(core) => self.core_port(core, "data")?,
            Entry::CoreFetch(core) => self.core_port(core, "fetch")?,
            Entry::Dma => {
                hops.push(self.graph.component(self.handles.dma).name.clone());
                match self.dma.classify(address, size)? {
                    DmaEndpoint::Local { .. } => PortRef::new(self.handles.dma, "tcdm"),
                    DmaEndpoint::Remote { .. } => PortRef::new(self.handles.dma, "axi"),
                }
            }
        };
        let resolution = self.walk(start, address, size, hops)?;
        debug!(
            "resolve {:?} {:#x}+{}: {:?} via {:?}",
            entry, address, size, resolution.terminal, resolution.hops
        );
        Ok(resolution)
    }

    fn walk(
        &self,
        mut port: PortRef,
        mut address: u64,
        mut size: u64,
        mut hops: Vec<String>,
    ) -> TopologyResult<Resolution> {
        let mut router_hops = 0;
        // Each step crosses one component; more steps than components means a loop.
        for _ in 0..=self.graph.num_components() {
            let node = self.graph.component(port.component);
            trace!("walk {} @ {:#x}", self.graph.qualified(&port), address);
            match node.kind {
                ComponentKind::Router(idx) => {
                    router_hops += 1;
                    if router_hops > self.routers.len() + 1 {
                        break;
                    }
                    let router = &self.routers[idx];
                    let decision = router.route(address, size)?;
                    hops.push(router.name().to_string());
                    address = decision.address;
                    port = decision.destination.clone();
                    continue;
                }
                ComponentKind::Tcdm => {
                    let path = if port.port == "dma_input" {
                        TcdmPath::Dma
                    } else {
                        let master = port
                            .port
                            .strip_prefix("in_")
                            .and_then(|idx| idx.parse().ok())
                            .ok_or_else(|| TopologyError::UnknownPort {
                                component: node.name.clone(),
                                port: port.port.clone(),
                            })?;
                        TcdmPath::Core(master)
                    };
                    let slot = self.tcdm.access(path, address, size)?;
                    return Ok(Resolution {
                        terminal: Terminal::Tcdm { path, slot },
                        hops,
                    });
                }
                ComponentKind::ZeroMemory => {
                    self.zero_mem.check(address, size.max(1) as usize)?;
                    return Ok(Resolution {
                        terminal: Terminal::ZeroMemory { offset: address },
                        hops,
                    });
                }
                ComponentKind::ClusterRegisters => {
                    match address.checked_add(size.max(1)) {
                        Some(end) if end <= self.arch.peripheral_region.size() => {}
                        _ => return Err(TopologyError::unroutable(node.name.clone(), address, size)),
                    }
                    return Ok(Resolution {
                        terminal: Terminal::Registers { offset: address },
                        hops,
                    });
                }
                ComponentKind::SocPeer => {
                    return Ok(Resolution {
                        terminal: Terminal::Soc {
                            port: self.graph.qualified(&port),
                            address,
                        },
                        hops,
                    });
                }
                ComponentKind::InstructionCache => {
                    hops.push(node.name.clone());
                    address = self.icache.refill_address(address);
                    size = self.icache.line_bytes();
                    port = PortRef::new(port.component, "refill");
                }
                _ => {}
            }
            port = match self.graph.follow(&port) {
                Some(next) => next.clone(),
                None => return Err(TopologyError::unroutable(self.graph.qualified(&port), address, size)),
            };
        }
        Err(TopologyError::unroutable(
            format!("routing loop at {}", self.graph.qualified(&port)),
            address,
            size,
        ))
    }

    /// Read through the fabric. Only zero-backed destinations carry data here.
    pub fn read(&self, entry: Entry, address: u64, len: usize) -> TopologyResult<Vec<u8>> {
        let resolution = self.resolve(entry, address, len as u64)?;
        match resolution.terminal {
            Terminal::ZeroMemory { offset } => self.zero_mem.read(offset, len),
            other => Err(TopologyError::NoBackingData {
                terminal: other.describe(),
                address,
            }),
        }
    }

    /// JSON description of components, bindings and router tables.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
