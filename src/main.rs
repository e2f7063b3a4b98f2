use std::fs;

use anyhow::Context;
use clap::Parser;
use log::{error, LevelFilter};

use cluster_topology::cluster::topology::{ClusterTopology, Entry, Resolution};
use cluster_topology::ui::{make_cluster, TopologyArgs};

fn describe(result: anyhow::Result<Resolution>) -> String {
    match result {
        Ok(res) => format!("{:?} via [{}]", res.terminal, res.hops.join(" -> ")),
        Err(err) => format!("fault: {err}"),
    }
}

fn probe(cluster: &ClusterTopology, address: u64) {
    println!("probe {address:#010x}:");
    for (label, entry) in [
        ("narrow", Entry::NarrowInput),
        ("wide", Entry::WideInput),
        ("pe0", Entry::CoreData(0)),
        ("dma", Entry::Dma),
    ] {
        let result = cluster.resolve(entry, address, 4).map_err(anyhow::Error::from);
        println!("  {label:>6}: {}", describe(result));
    }
}

fn run(argv: &TopologyArgs) -> anyhow::Result<()> {
    let config = fs::read_to_string(&argv.config_path)
        .with_context(|| format!("failed to read config file {}", argv.config_path.display()))?;
    let cluster = make_cluster(&config, Some(argv))?;

    let arch = cluster.arch();
    println!(
        "cluster @ {:#010x}: {} cores, {:?}, {} TCDM banks",
        arch.cluster_base,
        arch.core_count,
        cluster.wiring(),
        arch.total_banks()
    );
    println!("  tcdm       {}", arch.tcdm.region);
    println!("  peripheral {}", arch.peripheral_region);
    println!("  zero_mem   {}", arch.zero_region);
    println!(
        "  {} components, {} bindings",
        cluster.graph().num_components(),
        cluster.graph().num_bindings()
    );

    if argv.json {
        println!("{}", cluster.to_json()?);
    }
    for &address in &argv.probe {
        probe(&cluster, address);
    }
    Ok(())
}

pub fn main() {
    let argv = TopologyArgs::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = argv.log {
        logger.filter_level(match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        });
    }
    logger.init();

    if let Err(err) = run(&argv) {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
