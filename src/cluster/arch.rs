use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::base::{AddressRegion, TopologyError, TopologyResult};
use crate::fabric::TcdmGeometry;

/// Interrupt line numbers on every core.
pub const IRQ_SOFTWARE: u32 = 3;
pub const IRQ_TIMER: u32 = 7;
pub const IRQ_EXTERNAL: u32 = 11;
pub const DEFAULT_BARRIER_IRQ: u32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreVariant {
    Fast,
    #[default]
    Accurate,
}

impl FromStr for CoreVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fast" => Ok(Self::Fast),
            "accurate" => Ok(Self::Accurate),
            _ => Err(format!(
                "unsupported core type '{}', expected one of: fast, accurate",
                value
            )),
        }
    }
}

impl fmt::Display for CoreVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreVariant::Fast => write!(f, "fast"),
            CoreVariant::Accurate => write!(f, "accurate"),
        }
    }
}

/// Everything the builder needs to know about one cluster. Plain data; checked by
/// [`Architecture::validate`] before anything is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Architecture {
    pub core_count: usize,
    pub first_hart_id: usize,
    pub isa: String,
    pub core_variant: CoreVariant,
    pub uses_vector_extension: bool,
    pub sequencer_enabled: bool,
    pub cluster_base: u64,
    pub boot_address: u64,
    /// Program entry reported by the cluster registers.
    pub entry: u64,
    pub auto_fetch: bool,
    pub tcdm: TcdmGeometry,
    pub peripheral_region: AddressRegion,
    pub zero_region: AddressRegion,
    pub barrier_interrupt_line: u32,
}

impl Architecture {
    /// Stock layout: 128 KiB TCDM in 4x8 banks of 8 bytes, then 64 KiB of peripherals and
    /// 64 KiB of zero memory.
    pub fn snitch(core_count: usize, cluster_base: u64) -> TopologyResult<Self> {
        Ok(Self {
            core_count,
            first_hart_id: 0,
            isa: "rv32imafdc".to_string(),
            core_variant: CoreVariant::Accurate,
            uses_vector_extension: false,
            sequencer_enabled: true,
            cluster_base,
            boot_address: 0x0000_1000,
            entry: 0x0000_1000,
            auto_fetch: false,
            tcdm: TcdmGeometry {
                region: AddressRegion::at_offset(cluster_base, 0, 0x0002_0000)?,
                banks_per_superbank: 8,
                superbanks: 4,
                bank_width: 8,
                masters: core_count,
            },
            peripheral_region: AddressRegion::at_offset(cluster_base, 0x0002_0000, 0x0001_0000)?,
            zero_region: AddressRegion::at_offset(cluster_base, 0x0003_0000, 0x0001_0000)?,
            barrier_interrupt_line: DEFAULT_BARRIER_IRQ,
        })
    }

    pub fn total_banks(&self) -> usize {
        self.tcdm.total_banks()
    }

    pub fn bank_size(&self) -> u64 {
        self.tcdm.bank_size()
    }

    /// Whether every integer core gets a floating-point companion subsystem.
    pub fn has_fp_subsystem(&self) -> bool {
        self.core_variant == CoreVariant::Accurate && !self.uses_vector_extension
    }

    /// Index of the only core allowed to offload transfers to the DMA engine.
    pub fn dma_initiator(&self) -> usize {
        self.core_count - 1
    }

    pub fn validate(&self) -> TopologyResult<()> {
        if self.core_count == 0 {
            return Err(TopologyError::configuration("cluster needs at least one core"));
        }
        if self.tcdm.masters != self.core_count {
            return Err(TopologyError::configuration(format!(
                "TCDM has {} masters but the cluster has {} cores",
                self.tcdm.masters, self.core_count
            )));
        }

        let banks = self.total_banks();
        if banks == 0 || !banks.is_power_of_two() {
            return Err(TopologyError::configuration(format!(
                "TCDM bank count {} ({} superbanks x {} banks) is not a power of two",
                banks, self.tcdm.superbanks, self.tcdm.banks_per_superbank
            )));
        }
        let width = self.tcdm.bank_width;
        if width == 0 || !width.is_power_of_two() {
            return Err(TopologyError::configuration(format!(
                "TCDM bank width {width} is not a power of two"
            )));
        }
        let stride = banks as u64 * width;
        if self.tcdm.region.size() % stride != 0 {
            return Err(TopologyError::configuration(format!(
                "TCDM size {:#x} is not a multiple of {} banks x {} bytes",
                self.tcdm.region.size(),
                banks,
                width
            )));
        }

        let named = [
            ("tcdm", self.tcdm.region),
            ("peripheral", self.peripheral_region),
            ("zero_mem", self.zero_region),
        ];
        for (i, (name_a, a)) in named.iter().enumerate() {
            for (name_b, b) in &named[i + 1..] {
                if a.overlaps(b) {
                    return Err(TopologyError::configuration(format!(
                        "{name_a} region {a} overlaps {name_b} region {b}"
                    )));
                }
            }
        }

        if [IRQ_SOFTWARE, IRQ_TIMER, IRQ_EXTERNAL].contains(&self.barrier_interrupt_line) {
            return Err(TopologyError::configuration(format!(
                "barrier interrupt line {} collides with a standard interrupt line",
                self.barrier_interrupt_line
            )));
        }
        Ok(())
    }
}
