use crate::base::TopologyError;
use crate::cluster::arch::Architecture;
use crate::cluster::builder::ClusterTopologyBuilder;
use crate::cluster::topology::{ClusterTopology, Entry, Terminal};
use crate::fabric::interleaver::BankSlot;
use crate::fabric::tcdm::TcdmPath;

const BASE: u64 = 0x1000_0000;

fn snitch(cores: usize) -> ClusterTopology {
    let arch = Architecture::snitch(cores, BASE).expect("stock layout is valid");
    ClusterTopologyBuilder::new(arch)
        .build()
        .expect("cluster should build")
}

fn slot(terminal: &Terminal) -> BankSlot {
    match terminal {
        Terminal::Tcdm { slot, .. } => *slot,
        other => panic!("expected a TCDM terminal, got {other:?}"),
    }
}

#[test]
fn core_and_dma_agree_on_bank() {
    let topo = snitch(8);
    let core = topo
        .resolve(Entry::CoreData(3), 0x1000_0008, 4)
        .expect("core access resolves");
    assert_eq!(
        Terminal::Tcdm {
            path: TcdmPath::Core(3),
            slot: BankSlot {
                bank: 1,
                row: 0,
                byte_offset: 0,
            },
        },
        core.terminal
    );
    assert_eq!(vec!["pe3_ico".to_string()], core.hops);

    let dma = topo
        .resolve(Entry::Dma, 0x1000_0008, 8)
        .expect("dma access resolves");
    assert_eq!(
        Terminal::Tcdm {
            path: TcdmPath::Dma,
            slot: BankSlot {
                bank: 1,
                row: 0,
                byte_offset: 0,
            },
        },
        dma.terminal
    );
    assert_eq!(
        vec!["idma".to_string(), "tcdm_dma_ico".to_string()],
        dma.hops
    );
}

#[test]
fn every_tcdm_word_maps_identically_on_both_paths() {
    let topo = snitch(8);
    let region = topo.arch().tcdm.region;
    let width = topo.arch().tcdm.bank_width;
    for (i, addr) in (region.base()..region.end()).step_by(width as usize).enumerate() {
        let core = topo
            .resolve(Entry::CoreData(i % 8), addr, width)
            .expect("core access resolves");
        let dma = topo
            .resolve(Entry::Dma, addr, width)
            .expect("dma access resolves");
        assert_eq!(slot(&core.terminal), slot(&dma.terminal), "at {addr:#x}");
    }
}

#[test]
fn last_word_wraps_to_last_bank() {
    let topo = snitch(8);
    let res = topo
        .resolve(Entry::WideInput, 0x1001_fff8, 8)
        .expect("last word resolves");
    let slot = slot(&res.terminal);
    assert_eq!(31, slot.bank);
    assert_eq!(0x1_fff8 / 8 / 32, slot.row);
}

#[test]
fn narrow_bus_reaches_tcdm_through_first_core_router() {
    let topo = snitch(8);
    let res = topo
        .resolve(Entry::NarrowInput, 0x1000_0010, 4)
        .expect("narrow access resolves");
    assert_eq!(
        vec!["narrow_axi".to_string(), "pe0_ico".to_string()],
        res.hops
    );
    match res.terminal {
        Terminal::Tcdm { path, slot } => {
            assert_eq!(TcdmPath::Core(0), path);
            assert_eq!(2, slot.bank);
        }
        other => panic!("unexpected terminal {other:?}"),
    }
}

#[test]
fn wide_bus_reaches_tcdm_on_dma_side() {
    let topo = snitch(8);
    let res = topo
        .resolve(Entry::WideInput, 0x1000_0100, 64)
        .expect("wide access resolves");
    assert_eq!(vec!["wide_axi".to_string()], res.hops);
    assert!(matches!(
        res.terminal,
        Terminal::Tcdm {
            path: TcdmPath::Dma,
            ..
        }
    ));
}

#[test]
fn zero_region_reads_zero_from_either_bus() {
    let topo = snitch(8);
    let wide = topo
        .resolve(Entry::WideInput, 0x1003_0010, 16)
        .expect("wide access resolves");
    let narrow = topo
        .resolve(Entry::NarrowInput, 0x1003_0010, 16)
        .expect("narrow access resolves");
    assert_eq!(Terminal::ZeroMemory { offset: 0x10 }, wide.terminal);
    assert_eq!(wide.terminal, narrow.terminal);
    assert_eq!(
        vec!["narrow_axi".to_string(), "wide_axi".to_string()],
        narrow.hops
    );

    assert_eq!(vec![0u8; 16], topo.read(Entry::WideInput, 0x1003_0010, 16).unwrap());
    assert_eq!(vec![0u8; 16], topo.read(Entry::NarrowInput, 0x1003_0010, 16).unwrap());
    assert!(topo.zero_memory().write(0x10, &[0xaa; 4]).is_ok());
    assert_eq!(vec![0u8; 4], topo.read(Entry::NarrowInput, 0x1003_0010, 4).unwrap());
}

#[test]
fn core_data_to_zero_region_leaves_core_router() {
    let topo = snitch(4);
    let res = topo
        .resolve(Entry::CoreData(2), 0x1003_0000, 4)
        .expect("core access resolves");
    assert_eq!(Terminal::ZeroMemory { offset: 0 }, res.terminal);
    assert_eq!(
        vec![
            "pe2_ico".to_string(),
            "narrow_axi".to_string(),
            "wide_axi".to_string()
        ],
        res.hops
    );
}

#[test]
fn peripheral_accesses_are_rebased() {
    let topo = snitch(4);
    let res = topo
        .resolve(Entry::NarrowInput, 0x1002_0010, 4)
        .expect("peripheral access resolves");
    assert_eq!(Terminal::Registers { offset: 0x10 }, res.terminal);

    let from_core = topo
        .resolve(Entry::CoreData(1), 0x1002_0040, 4)
        .expect("core peripheral access resolves");
    assert_eq!(Terminal::Registers { offset: 0x40 }, from_core.terminal);
}

#[test]
fn unclaimed_addresses_leave_through_soc_ports() {
    let topo = snitch(4);
    let narrow = topo
        .resolve(Entry::NarrowInput, 0x8000_0000, 4)
        .expect("default output");
    assert_eq!(
        Terminal::Soc {
            port: "soc.narrow_input".to_string(),
            address: 0x8000_0000,
        },
        narrow.terminal
    );
    let wide = topo
        .resolve(Entry::WideInput, 0x8000_0000, 4)
        .expect("default output");
    assert_eq!(
        Terminal::Soc {
            port: "soc.wide_input".to_string(),
            address: 0x8000_0000,
        },
        wide.terminal
    );
    let dma = topo
        .resolve(Entry::Dma, 0x8000_0000, 256)
        .expect("remote dma access");
    assert_eq!(vec!["idma".to_string(), "wide_axi".to_string()], dma.hops);
    assert!(matches!(dma.terminal, Terminal::Soc { .. }));
}

#[test]
fn fetches_refill_through_wide_bus() {
    let topo = snitch(4);
    let res = topo
        .resolve(Entry::CoreFetch(2), 0x1003_0044, 4)
        .expect("fetch resolves");
    assert_eq!(Terminal::ZeroMemory { offset: 0 }, res.terminal);
    assert_eq!(
        vec!["icache".to_string(), "wide_axi".to_string()],
        res.hops
    );

    let boot = topo
        .resolve(Entry::CoreFetch(0), topo.arch().boot_address, 4)
        .expect("boot fetch resolves");
    assert!(matches!(boot.terminal, Terminal::Soc { .. }));
}

#[test]
fn dma_span_straddling_tcdm_faults_access() {
    let topo = snitch(8);
    let err = topo
        .resolve(Entry::Dma, 0x1001_fff8, 0x10)
        .expect_err("straddling span must fault");
    assert!(matches!(err, TopologyError::UnroutableAccess { .. }));
    assert!(!err.is_configuration());
}

#[test]
fn unknown_core_is_rejected() {
    let topo = snitch(8);
    assert!(matches!(
        topo.resolve(Entry::CoreData(8), 0x1000_0000, 4),
        Err(TopologyError::UnknownPort { .. })
    ));
}

#[test]
fn data_reads_outside_zero_memory_fault() {
    let topo = snitch(2);
    let err = topo
        .read(Entry::WideInput, 0x1000_0000, 4)
        .expect_err("TCDM contents live in the simulator");
    assert_eq!(
        TopologyError::NoBackingData {
            terminal: "tcdm bank 0".to_string(),
            address: 0x1000_0000,
        },
        err
    );
    assert!(!err.is_configuration());

    let err = topo
        .read(Entry::NarrowInput, 0x1002_0000, 4)
        .expect_err("registers hold no data here");
    assert!(matches!(
        err,
        TopologyError::NoBackingData { ref terminal, .. } if terminal == "cluster_registers"
    ));
}

#[test]
fn concurrent_resolution_agrees() {
    let topo = std::sync::Arc::new(snitch(8));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let topo = topo.clone();
            std::thread::spawn(move || {
                (0..256u64)
                    .map(|w| {
                        topo.resolve(Entry::CoreData(t), BASE + w * 8, 8)
                            .map(|r| r.bank())
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for result in &results[1..] {
        assert_eq!(&results[0], result);
    }
}
