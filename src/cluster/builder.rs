use log::{debug, info};
use serde::Serialize;

use crate::base::{AddressRegion, TopologyResult};
use crate::cluster::arch::{Architecture, IRQ_EXTERNAL, IRQ_SOFTWARE, IRQ_TIMER};
use crate::cluster::components::{
    ClusterRegisters, Core, CoreModel, DmaEngine, FpSubsystem, HierarchicalCache,
    RegistersFlavor, Sequencer, ZeroMemory,
};
use crate::cluster::topology::{ClusterHandles, ClusterTopology};
use crate::fabric::graph::{AddressFilter, BindingGraph};
use crate::fabric::router::Router;
use crate::fabric::tcdm::TcdmSubsystem;
use crate::fabric::types::{indexed, ComponentId, ComponentKind, PortRef};

/// Bytes per cycle of the cluster buses.
pub const WIDE_BANDWIDTH: u32 = 64;
pub const NARROW_BANDWIDTH: u32 = 8;

/// How an integer core hands instructions to its FP subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FpDispatch {
    Direct,
    Sequenced,
}

/// Per-core wiring variant, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoreWiring {
    /// Integer core drives its own stream ports.
    Integer(CoreModel),
    /// Integer core plus FP subsystem; the FP side owns the stream ports.
    WithFpSubsystem(FpDispatch),
}

impl CoreWiring {
    pub fn select(arch: &Architecture) -> Self {
        if arch.has_fp_subsystem() {
            let dispatch = if arch.sequencer_enabled {
                FpDispatch::Sequenced
            } else {
                FpDispatch::Direct
            };
            CoreWiring::WithFpSubsystem(dispatch)
        } else {
            CoreWiring::Integer(CoreModel::SnitchFast {
                spatz: arch.uses_vector_extension,
            })
        }
    }

    pub fn core_model(&self) -> CoreModel {
        match self {
            CoreWiring::Integer(model) => *model,
            CoreWiring::WithFpSubsystem(_) => CoreModel::Snitch,
        }
    }
}

/// Parent-side ports the cluster's northbound outputs bind to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocEndpoints {
    pub component: String,
    pub wide_port: String,
    pub narrow_port: String,
}

impl Default for SocEndpoints {
    fn default() -> Self {
        Self {
            component: "soc".to_string(),
            wide_port: "wide_input".to_string(),
            narrow_port: "narrow_input".to_string(),
        }
    }
}

/// Routers plus the graph their mappings are mirrored into.
struct Assembly {
    graph: BindingGraph<ComponentKind>,
    routers: Vec<Router>,
    router_components: Vec<ComponentId>,
}

impl Assembly {
    fn add_router(&mut self, name: &str, bandwidth: u32) -> usize {
        let idx = self.routers.len();
        let id = self
            .graph
            .add_component(name, ComponentKind::Router(idx), ["input", "output"]);
        self.routers.push(Router::new(name, bandwidth));
        self.router_components.push(id);
        idx
    }

    fn router_input(&self, router: usize) -> PortRef {
        PortRef::new(self.router_components[router], "input")
    }

    fn map(
        &mut self,
        router: usize,
        region: AddressRegion,
        dst: PortRef,
        rebase: bool,
    ) -> TopologyResult<()> {
        self.graph.port(dst.component, &dst.port)?;
        self.routers[router].add_mapping(region, dst.clone(), rebase)?;
        let out = PortRef::new(self.router_components[router], "output");
        self.graph
            .connect_filtered(out, dst, AddressFilter::mapping(region, rebase, false))?;
        Ok(())
    }

    fn map_default(&mut self, router: usize, dst: PortRef) -> TopologyResult<()> {
        self.graph.port(dst.component, &dst.port)?;
        self.routers[router].set_default(dst.clone())?;
        let out = PortRef::new(self.router_components[router], "output");
        self.graph
            .connect_filtered(out, dst, AddressFilter::default_output())?;
        Ok(())
    }

    fn bind(&mut self, src: ComponentId, src_port: &str, dst: ComponentId, dst_port: &str) -> TopologyResult<()> {
        let src = self.graph.port(src, src_port)?;
        let dst = self.graph.port(dst, dst_port)?;
        self.graph.connect(src, dst)?;
        Ok(())
    }

    fn bind_to(&mut self, src: ComponentId, src_port: &str, dst: PortRef) -> TopologyResult<()> {
        let src = self.graph.port(src, src_port)?;
        self.graph.connect(src, dst)?;
        Ok(())
    }
}

/// Composition root: turns an [`Architecture`] into a fully wired [`ClusterTopology`].
#[derive(Debug, Clone)]
pub struct ClusterTopologyBuilder {
    arch: Architecture,
    soc: SocEndpoints,
}

impl ClusterTopologyBuilder {
    pub fn new(arch: Architecture) -> Self {
        Self {
            arch,
            soc: SocEndpoints::default(),
        }
    }

    pub fn with_soc(mut self, soc: SocEndpoints) -> Self {
        self.soc = soc;
        self
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    /// Validate, instantiate and bind. Either the whole cluster comes back or nothing does.
    pub fn build(&self) -> TopologyResult<ClusterTopology> {
        let arch = &self.arch;
        arch.validate()?;
        let nb_core = arch.core_count;
        let wiring = CoreWiring::select(arch);
        debug!("cluster wiring variant: {:?}", wiring);

        let mut asm = Assembly {
            graph: BindingGraph::new(),
            routers: Vec::new(),
            router_components: Vec::new(),
        };

        //
        // Components
        //

        let mut cluster_ports: Vec<String> = ["wide_input", "wide_soc", "narrow_input", "narrow_soc", "fetchen"]
            .map(String::from)
            .to_vec();
        for core in 0..nb_core {
            cluster_ports.push(indexed("meip", core));
            cluster_ports.push(indexed("mtip", core));
            cluster_ports.push(indexed("msip", core));
        }
        let cluster = asm
            .graph
            .add_component("cluster", ComponentKind::Cluster, cluster_ports);
        let soc = asm.graph.add_component(
            self.soc.component.as_str(),
            ComponentKind::SocPeer,
            [self.soc.wide_port.as_str(), self.soc.narrow_port.as_str()],
        );

        let wide_axi = asm.add_router("wide_axi", WIDE_BANDWIDTH);
        let narrow_axi = asm.add_router("narrow_axi", NARROW_BANDWIDTH);
        let tcdm_dma_ico = asm.add_router("tcdm_dma_ico", WIDE_BANDWIDTH);

        let tcdm = TcdmSubsystem::attach(&mut asm.graph, "tcdm", &arch.tcdm)?;

        let zero_mem = ZeroMemory::new(arch.zero_region.size());
        let zero_mem_id =
            asm.graph
                .add_component("zero_mem", ComponentKind::ZeroMemory, ZeroMemory::PORTS);

        let icache = HierarchicalCache::new(nb_core);
        let icache_id =
            asm.graph
                .add_component("icache", ComponentKind::InstructionCache, icache.ports());

        let mut cores = Vec::with_capacity(nb_core);
        let mut core_ids = Vec::with_capacity(nb_core);
        let mut fp_subsystems = Vec::new();
        let mut fp_ids = Vec::new();
        let mut sequencers = Vec::new();
        let mut sequencer_ids = Vec::new();
        let mut core_icos = Vec::with_capacity(nb_core);

        for core_id in 0..nb_core {
            let hart_id = arch.first_hart_id + core_id;
            cores.push(Core {
                model: wiring.core_model(),
                hart_id,
                isa: arch.isa.clone(),
                boot_addr: arch.boot_address,
                fetch_enable: arch.auto_fetch,
            });
            core_ids.push(asm.graph.add_component(
                format!("pe{core_id}"),
                ComponentKind::Core(core_id),
                Core::ports(arch.barrier_interrupt_line),
            ));

            if let CoreWiring::WithFpSubsystem(_) = wiring {
                fp_subsystems.push(FpSubsystem {
                    hart_id,
                    isa: arch.isa.clone(),
                    boot_addr: arch.boot_address,
                    fetch_enable: arch.auto_fetch,
                });
                fp_ids.push(asm.graph.add_component(
                    format!("fp_ss{core_id}"),
                    ComponentKind::FpSubsystem(core_id),
                    FpSubsystem::ports(),
                ));
                sequencers.push(Sequencer { latency: 0 });
                sequencer_ids.push(asm.graph.add_component(
                    format!("fpu_sequencer{core_id}"),
                    ComponentKind::Sequencer(core_id),
                    Sequencer::PORTS,
                ));
            }

            core_icos.push(asm.add_router(&format!("pe{core_id}_ico"), arch.tcdm.bank_width as u32));
        }

        let flavor = if arch.uses_vector_extension {
            RegistersFlavor::Spatz
        } else {
            RegistersFlavor::Standard
        };
        let registers = ClusterRegisters::new(nb_core, arch.entry, flavor);
        let registers_id = asm.graph.add_component(
            "cluster_registers",
            ComponentKind::ClusterRegisters,
            registers.ports(),
        );

        let dma = DmaEngine::new(arch.tcdm.region);
        let dma_id = asm
            .graph
            .add_component("idma", ComponentKind::Dma, DmaEngine::PORTS);

        //
        // Bindings
        //

        let tcdm_region = arch.tcdm.region;

        // Narrow bus: core data traffic leaving the core-local routers.
        let narrow_in = asm.router_input(narrow_axi);
        asm.bind_to(cluster, "narrow_input", narrow_in.clone())?;
        asm.map_default(narrow_axi, PortRef::new(cluster, "narrow_soc"))?;
        asm.bind(cluster, "narrow_soc", soc, &self.soc.narrow_port)?;
        // Remote TCDM accesses enter through core 0's local router.
        let first_ico_in = asm.router_input(core_icos[0]);
        asm.map(narrow_axi, tcdm_region, first_ico_in, false)?;

        // Wide bus: DMA, instruction refills, remote TCDM.
        let wide_in = asm.router_input(wide_axi);
        asm.bind_to(cluster, "wide_input", wide_in.clone())?;
        asm.map_default(wide_axi, PortRef::new(cluster, "wide_soc"))?;
        asm.bind(cluster, "wide_soc", soc, &self.soc.wide_port)?;
        asm.bind_to(icache_id, "refill", wide_in.clone())?;
        asm.map(wide_axi, tcdm_region, tcdm.dma_input(), true)?;

        // The last core is the only DMA offload initiator.
        let initiator = core_ids[arch.dma_initiator()];
        asm.bind(initiator, "offload", dma_id, "offload")?;
        asm.bind(dma_id, "offload_grant", initiator, "offload_grant")?;

        for &core in &core_ids {
            asm.bind(cluster, "fetchen", core, "fetchen")?;
        }
        for (core_id, &core) in core_ids.iter().enumerate() {
            asm.bind(core, "barrier_req", registers_id, &indexed("barrier_req", core_id))?;
        }
        for (core_id, &core) in core_ids.iter().enumerate() {
            let ico = core_icos[core_id];
            let ico_in = asm.router_input(ico);
            asm.bind_to(core, "data", ico_in)?;
            asm.map(ico, tcdm_region, tcdm.core_input(core_id)?, true)?;
            asm.map_default(ico, narrow_in.clone())?;
            asm.bind(core, "fetch", icache_id, &indexed("input", core_id))?;

            asm.bind(core, "flush_cache", icache_id, "flush")?;
            asm.bind(icache_id, "flush_ack", core, "flush_cache_ack")?;
        }

        for (core_id, &core) in core_ids.iter().enumerate() {
            let ico_in = asm.router_input(core_icos[core_id]);
            match wiring {
                CoreWiring::WithFpSubsystem(dispatch) => {
                    let fp = fp_ids[core_id];
                    asm.bind_to(fp, "data", ico_in.clone())?;
                    asm.bind(cluster, "fetchen", fp, "fetchen")?;
                    for ssr in Core::SSR_PORTS {
                        asm.bind_to(fp, ssr, ico_in.clone())?;
                    }
                    match dispatch {
                        FpDispatch::Sequenced => {
                            let seq = sequencer_ids[core_id];
                            asm.bind(core, "acc_req", seq, "input")?;
                            asm.bind(seq, "output", fp, "acc_req")?;
                            asm.bind(core, "acc_req_ready", seq, "acc_req_ready")?;
                            asm.bind(seq, "acc_req_ready_o", fp, "acc_req_ready")?;
                        }
                        FpDispatch::Direct => {
                            asm.bind(core, "acc_req", fp, "acc_req")?;
                            asm.bind(core, "acc_req_ready", fp, "acc_req_ready")?;
                        }
                    }
                    asm.bind(fp, "acc_rsp", core, "acc_rsp")?;
                }
                CoreWiring::Integer(_) => {
                    for ssr in Core::SSR_PORTS {
                        asm.bind_to(core, ssr, ico_in.clone())?;
                    }
                }
            }
        }

        // Cluster peripherals.
        asm.map(
            narrow_axi,
            arch.peripheral_region,
            PortRef::new(registers_id, "input"),
            true,
        )?;
        for &core in &core_ids {
            asm.bind(registers_id, "barrier_ack", core, "barrier_ack")?;
        }
        let barrier_irq = indexed("irq", arch.barrier_interrupt_line as usize);
        for (core_id, &core) in core_ids.iter().enumerate() {
            asm.bind(registers_id, &indexed("external_irq", core_id), core, &barrier_irq)?;
            asm.bind(cluster, &indexed("msip", core_id), core, &indexed("irq", IRQ_SOFTWARE as usize))?;
            asm.bind(cluster, &indexed("mtip", core_id), core, &indexed("irq", IRQ_TIMER as usize))?;
            asm.bind(cluster, &indexed("meip", core_id), core, &indexed("irq", IRQ_EXTERNAL as usize))?;
        }

        // Cluster DMA: remote side on the wide bus, local side through its own router.
        asm.bind_to(dma_id, "axi", wide_in.clone())?;
        let dma_ico_in = asm.router_input(tcdm_dma_ico);
        asm.bind_to(dma_id, "tcdm", dma_ico_in)?;
        asm.map(tcdm_dma_ico, tcdm_region, tcdm.dma_input(), true)?;

        // Zero memory resolves identically from either bus.
        asm.map(
            wide_axi,
            arch.zero_region,
            PortRef::new(zero_mem_id, "input"),
            true,
        )?;
        asm.map(narrow_axi, arch.zero_region, wide_in, false)?;

        info!(
            "built cluster: {} cores ({:?}), {} TCDM banks, {} components, {} bindings",
            nb_core,
            wiring,
            arch.total_banks(),
            asm.graph.num_components(),
            asm.graph.num_bindings()
        );

        let handles = ClusterHandles {
            cluster,
            soc,
            wide_axi,
            narrow_axi,
            tcdm_dma_ico,
            core_icos,
            zero_mem: zero_mem_id,
            icache: icache_id,
            registers: registers_id,
            dma: dma_id,
            cores: core_ids,
            fp_subsystems: fp_ids,
            sequencers: sequencer_ids,
        };

        Ok(ClusterTopology::new(
            arch.clone(),
            asm.graph,
            asm.routers,
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
        ))
    }
}
