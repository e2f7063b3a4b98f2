use serde::Serialize;

use crate::base::{AddressRegion, TopologyError, TopologyResult};
use crate::fabric::graph::BindingGraph;
use crate::fabric::interleaver::{BankChunks, BankInterleaver, BankSlot, DmaBankInterleaver, InterleaveMap};
use crate::fabric::types::{indexed, ComponentId, ComponentKind, PortRef};

/// Bank geometry of the tightly-coupled data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TcdmGeometry {
    pub region: AddressRegion,
    pub banks_per_superbank: usize,
    pub superbanks: usize,
    pub bank_width: u64,
    pub masters: usize,
}

impl TcdmGeometry {
    pub fn total_banks(&self) -> usize {
        self.superbanks * self.banks_per_superbank
    }

    pub fn bank_size(&self) -> u64 {
        match self.total_banks() {
            0 => 0,
            n => self.region.size() / n as u64,
        }
    }
}

/// Leaf storage unit. Timing and contents live in the simulator; only the shape is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryBank {
    pub size: u64,
    pub width_log2: u32,
    pub atomics: bool,
    pub latency: u64,
}

/// Which entry path reached a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TcdmPath {
    Core(usize),
    Dma,
}

/// Banks plus the core-facing and DMA-facing interleavers that share them.
#[derive(Debug, Clone, Serialize)]
pub struct TcdmSubsystem {
    geometry: TcdmGeometry,
    banks: Vec<MemoryBank>,
    interleaver: BankInterleaver,
    dma_interleaver: DmaBankInterleaver,
    component: ComponentId,
    bank_components: Vec<ComponentId>,
}

impl TcdmSubsystem {
    pub fn attach(
        graph: &mut BindingGraph<ComponentKind>,
        name: &str,
        geometry: &TcdmGeometry,
    ) -> TopologyResult<Self> {
        let num_banks = geometry.total_banks();
        let map = InterleaveMap::new(num_banks, geometry.bank_width)?;
        if geometry.masters == 0 {
            return Err(TopologyError::configuration("TCDM needs at least one master"));
        }

        let bank = MemoryBank {
            size: geometry.bank_size(),
            width_log2: map.interleaving_bits(),
            atomics: true,
            latency: 0,
        };
        let banks = vec![bank; num_banks];

        let mut tcdm_ports: Vec<String> =
            (0..geometry.masters).map(|i| indexed("in", i)).collect();
        tcdm_ports.push("dma_input".to_string());
        let component = graph.add_component(name, ComponentKind::Tcdm, tcdm_ports);

        let bank_outputs: Vec<String> = (0..num_banks).map(|k| indexed("out", k)).collect();
        let mut ico_ports: Vec<String> = (0..geometry.masters).map(|i| indexed("in", i)).collect();
        ico_ports.extend(bank_outputs.iter().cloned());
        let ico = graph.add_component(
            format!("{name}/interleaver"),
            ComponentKind::Interleaver,
            ico_ports,
        );

        let mut dma_ports = vec!["input".to_string()];
        dma_ports.extend(bank_outputs.iter().cloned());
        let dma_ico = graph.add_component(
            format!("{name}/dma_interleaver"),
            ComponentKind::DmaInterleaver,
            dma_ports,
        );

        let mut bank_components = Vec::with_capacity(num_banks);
        for bank_idx in 0..num_banks {
            let id = graph.add_component(
                format!("{name}/bank_{bank_idx}"),
                ComponentKind::MemoryBank(bank_idx),
                ["input"],
            );
            let out = indexed("out", bank_idx);
            graph.connect(graph.port(ico, &out)?, graph.port(id, "input")?)?;
            graph.connect(graph.port(dma_ico, &out)?, graph.port(id, "input")?)?;
            bank_components.push(id);
        }

        for master in 0..geometry.masters {
            let port = indexed("in", master);
            graph.connect(graph.port(component, &port)?, graph.port(ico, &port)?)?;
        }
        graph.connect(
            graph.port(component, "dma_input")?,
            graph.port(dma_ico, "input")?,
        )?;

        Ok(Self {
            geometry: *geometry,
            banks,
            interleaver: BankInterleaver::new(geometry.masters, map),
            dma_interleaver: DmaBankInterleaver::new(map),
            component,
            bank_components,
        })
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn geometry(&self) -> &TcdmGeometry {
        &self.geometry
    }

    pub fn banks(&self) -> &[MemoryBank] {
        &self.banks
    }

    pub fn bank_component(&self, bank: usize) -> Option<ComponentId> {
        self.bank_components.get(bank).copied()
    }

    pub fn core_input(&self, master: usize) -> TopologyResult<PortRef> {
        if master >= self.interleaver.num_masters() {
            return Err(TopologyError::UnknownPort {
                component: "tcdm".to_string(),
                port: indexed("in", master),
            });
        }
        Ok(PortRef::new(self.component, indexed("in", master)))
    }

    pub fn dma_input(&self) -> PortRef {
        PortRef::new(self.component, "dma_input")
    }

    fn check_span(&self, offset: u64, size: u64) -> TopologyResult<()> {
        let end = offset.checked_add(size.max(1));
        match end {
            Some(end) if end <= self.geometry.region.size() => Ok(()),
            _ => Err(TopologyError::unroutable("tcdm", offset, size)),
        }
    }

    /// Resolve a core-path access. `offset` is relative to the TCDM base.
    pub fn core_access(&self, master: usize, offset: u64, size: u64) -> TopologyResult<BankSlot> {
        self.check_span(offset, size)?;
        self.interleaver.route(master, offset)
    }

    pub fn dma_access(&self, offset: u64, size: u64) -> TopologyResult<BankSlot> {
        self.check_span(offset, size)?;
        Ok(self.dma_interleaver.route(offset))
    }

    /// Bank-word pieces of a DMA burst.
    pub fn dma_burst(&self, offset: u64, size: u64) -> TopologyResult<BankChunks> {
        self.check_span(offset, size)?;
        Ok(self.dma_interleaver.split(offset, size))
    }

    pub fn access(&self, path: TcdmPath, offset: u64, size: u64) -> TopologyResult<BankSlot> {
        match path {
            TcdmPath::Core(master) => self.core_access(master, offset, size),
            TcdmPath::Dma => self.dma_access(offset, size),
        }
    }
}
