use std::path::Path;

use anyhow::Context;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::Value;

use crate::base::{AddressRegion, TopologyResult};
use crate::cluster::arch::{Architecture, CoreVariant, DEFAULT_BARRIER_IRQ};
use crate::fabric::tcdm::TcdmGeometry;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> anyhow::Result<Self> {
        match section {
            Some(value) => value
                .clone()
                .try_into()
                .context("cannot deserialize config section"),
            None => {
                warn!("config section not found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterConfig {
    pub num_cores: usize,
    pub first_hartid: usize,
    pub isa: String,
    pub core_type: CoreVariant,
    pub use_spatz: bool,
    pub base: u64,
    pub boot_addr: u64,
    /// Defaults to `boot_addr` when absent.
    pub entry: Option<u64>,
    pub auto_fetch: bool,
    pub sequencer: bool,
    pub barrier_irq: u32,
}

impl Config for ClusterConfig {}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_cores: 8,
            first_hartid: 0,
            isa: "rv32imafdc".to_string(),
            core_type: CoreVariant::Accurate,
            use_spatz: false,
            base: 0x1000_0000,
            boot_addr: 0x1000,
            entry: None,
            auto_fetch: false,
            sequencer: true,
            barrier_irq: DEFAULT_BARRIER_IRQ,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TcdmConfig {
    pub offset: u64,
    pub size: u64,
    pub banks_per_superbank: usize,
    pub superbanks: usize,
    pub bank_width: u64,
}

impl Config for TcdmConfig {}

impl Default for TcdmConfig {
    fn default() -> Self {
        Self {
            offset: 0,
            size: 0x2_0000,
            banks_per_superbank: 8,
            superbanks: 4,
            bank_width: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PeripheralConfig {
    pub offset: u64,
    pub size: u64,
}

impl Config for PeripheralConfig {}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            offset: 0x2_0000,
            size: 0x1_0000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ZeroMemConfig {
    pub offset: u64,
    pub size: u64,
}

impl Config for ZeroMemConfig {}

impl Default for ZeroMemConfig {
    fn default() -> Self {
        Self {
            offset: 0x3_0000,
            size: 0x1_0000,
        }
    }
}

/// All sections of a cluster configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyConfig {
    pub cluster: ClusterConfig,
    pub tcdm: TcdmConfig,
    pub peripheral: PeripheralConfig,
    pub zero_mem: ZeroMemConfig,
}

impl TopologyConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let table: toml::Table = text.parse().context("cannot parse config")?;
        Ok(Self {
            cluster: ClusterConfig::from_section(table.get("cluster"))
                .context("in [cluster]")?,
            tcdm: TcdmConfig::from_section(table.get("tcdm")).context("in [tcdm]")?,
            peripheral: PeripheralConfig::from_section(table.get("peripheral"))
                .context("in [peripheral]")?,
            zero_mem: ZeroMemConfig::from_section(table.get("zero_mem"))
                .context("in [zero_mem]")?,
        })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in config file {}", path.display()))
    }

    /// Resolve section offsets against the cluster base. Does not validate cross-region
    /// invariants; the builder does.
    pub fn architecture(&self) -> TopologyResult<Architecture> {
        let c = &self.cluster;
        Ok(Architecture {
            core_count: c.num_cores,
            first_hart_id: c.first_hartid,
            isa: c.isa.clone(),
            core_variant: c.core_type,
            uses_vector_extension: c.use_spatz,
            sequencer_enabled: c.sequencer,
            cluster_base: c.base,
            boot_address: c.boot_addr,
            entry: c.entry.unwrap_or(c.boot_addr),
            auto_fetch: c.auto_fetch,
            tcdm: TcdmGeometry {
                region: AddressRegion::at_offset(c.base, self.tcdm.offset, self.tcdm.size)?,
                banks_per_superbank: self.tcdm.banks_per_superbank,
                superbanks: self.tcdm.superbanks,
                bank_width: self.tcdm.bank_width,
                masters: c.num_cores,
            },
            peripheral_region: AddressRegion::at_offset(c.base, self.peripheral.offset, self.peripheral.size)?,
            zero_region: AddressRegion::at_offset(c.base, self.zero_mem.offset, self.zero_mem.size)?,
            barrier_interrupt_line: c.barrier_irq,
        })
    }
}
