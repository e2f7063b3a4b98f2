use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::cluster::arch::CoreVariant;
use crate::cluster::builder::ClusterTopologyBuilder;
use crate::cluster::topology::ClusterTopology;
use crate::sim::config::TopologyConfig;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct TopologyArgs {
    #[arg(help = "Path to config.toml")]
    pub config_path: PathBuf,
    #[arg(long, help = "Override number of cores per cluster")]
    pub num_cores: Option<usize>,
    #[arg(long, help = "Override core type (fast, accurate)")]
    pub core_type: Option<CoreVariant>,
    #[arg(long, help = "Dispatch to FP subsystems without a sequencer")]
    pub no_sequencer: bool,
    #[arg(long, help = "Enable log at level (0:none, 1:info, 2:debug)")]
    pub log: Option<u64>,
    #[arg(long, help = "Dump the binding graph as JSON")]
    pub json: bool,
    #[arg(long, value_parser = parse_address, help = "Show how an address resolves")]
    pub probe: Vec<u64>,
}

fn parse_address(text: &str) -> Result<u64, String> {
    let digits = text.replace('_', "");
    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|err| format!("invalid address '{text}': {err}"))
}

/// Apply CLI overrides on top of the TOML configuration.
pub fn apply_overrides(config: &mut TopologyConfig, args: &TopologyArgs) {
    config.cluster.num_cores = args.num_cores.unwrap_or(config.cluster.num_cores);
    config.cluster.core_type = args.core_type.unwrap_or(config.cluster.core_type);
    if args.no_sequencer {
        config.cluster.sequencer = false;
    }
}

/// Make a cluster from the TOML configuration.
/// If `cli_args` is given, override TOML options with CLI arguments.
pub fn make_cluster(
    toml_string: &str,
    cli_args: Option<&TopologyArgs>,
) -> anyhow::Result<ClusterTopology> {
    let mut config = TopologyConfig::from_toml_str(toml_string)?;
    if let Some(args) = cli_args {
        apply_overrides(&mut config, args);
    }
    let arch = config
        .architecture()
        .context("invalid cluster address map")?;
    let topology = ClusterTopologyBuilder::new(arch)
        .build()
        .context("cannot build cluster")?;
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> TopologyArgs {
        let mut argv = vec!["cluster-topology", "cluster.toml"];
        argv.extend_from_slice(extra);
        TopologyArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_overrides_config() {
        let args = args(&["--num-cores", "2", "--core-type", "fast"]);
        let cluster = make_cluster("[cluster]\nnum_cores = 8\n", Some(&args)).unwrap();
        assert_eq!(2, cluster.cores().len());
        assert!(cluster.fp_subsystems().is_empty());
    }

    #[test]
    fn no_sequencer_flag_dispatches_directly() {
        let args = args(&["--no-sequencer"]);
        let cluster = make_cluster("", Some(&args)).unwrap();
        assert_eq!(8, cluster.sequencers().len());
        assert_eq!(8, cluster.fp_subsystems().len());
        let graph = cluster.graph();
        let fp = graph.find_component("fp_ss0").unwrap();
        let sources: Vec<String> = graph
            .bindings_to(&graph.port(fp, "acc_req").unwrap())
            .map(|b| graph.qualified(&b.src))
            .collect();
        assert_eq!(vec!["pe0.acc_req".to_string()], sources);
    }

    #[test]
    fn probes_accept_hex_and_decimal() {
        let args = args(&["--probe", "0x1000_0008", "--probe", "4096"]);
        assert_eq!(vec![0x1000_0008, 4096], args.probe);
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn invalid_geometry_fails_to_build() {
        let err = make_cluster("[tcdm]\nsuperbanks = 3\n", None).unwrap_err();
        assert!(format!("{err:#}").contains("power of two"));
    }
}
