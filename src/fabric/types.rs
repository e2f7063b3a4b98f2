use std::fmt;

use serde::Serialize;

pub type ComponentId = usize;
pub type BindingId = usize;

/// One named port on one instantiated component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortRef {
    pub component: ComponentId,
    pub port: String,
}

impl PortRef {
    pub fn new(component: ComponentId, port: impl Into<String>) -> Self {
        Self {
            component,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.component, self.port)
    }
}

/// Indexed port name, e.g. `in_3` or `irq_11`.
pub fn indexed(prefix: &str, idx: usize) -> String {
    format!("{prefix}_{idx}")
}

/// Closed set of component kinds a cluster instantiates. Indexed kinds point into the
/// owning topology's per-kind tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    Cluster,
    SocPeer,
    Router(usize),
    Tcdm,
    Interleaver,
    DmaInterleaver,
    MemoryBank(usize),
    ZeroMemory,
    InstructionCache,
    ClusterRegisters,
    Dma,
    Core(usize),
    FpSubsystem(usize),
    Sequencer(usize),
}
