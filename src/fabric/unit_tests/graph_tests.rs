use crate::base::{AddressRegion, TopologyError};
use crate::fabric::graph::{AddressFilter, BindingGraph};
use crate::fabric::types::PortRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Source,
    Sink,
}

fn pair() -> (BindingGraph<Kind>, usize, usize) {
    let mut graph = BindingGraph::new();
    let src = graph.add_component("src", Kind::Source, ["out", "aux"]);
    let dst = graph.add_component("dst", Kind::Sink, ["in"]);
    (graph, src, dst)
}

#[test]
fn connect_records_binding_both_ways() {
    let (mut graph, src, dst) = pair();
    let out = graph.port(src, "out").unwrap();
    let input = graph.port(dst, "in").unwrap();
    graph.connect(out.clone(), input.clone()).unwrap();

    assert_eq!(1, graph.num_bindings());
    assert_eq!(Some(&input), graph.follow(&out));
    assert_eq!(1, graph.bindings_to(&input).count());
    assert_eq!(Kind::Sink, graph.component(dst).kind);
}

#[test]
fn undeclared_port_is_rejected() {
    let (mut graph, src, dst) = pair();
    assert!(matches!(
        graph.port(src, "missing"),
        Err(TopologyError::UnknownPort { .. })
    ));
    let err = graph
        .connect(PortRef::new(src, "out"), PortRef::new(dst, "nope"))
        .unwrap_err();
    assert_eq!(
        TopologyError::UnknownPort {
            component: "dst".to_string(),
            port: "nope".to_string(),
        },
        err
    );
    assert_eq!(0, graph.num_bindings());
}

#[test]
fn filtered_bindings_are_not_followed() {
    let (mut graph, src, dst) = pair();
    let region = AddressRegion::new(0x1000, 0x100).unwrap();
    graph
        .connect_filtered(
            PortRef::new(src, "out"),
            PortRef::new(dst, "in"),
            AddressFilter::mapping(region, true, false),
        )
        .unwrap();
    assert_eq!(None, graph.follow(&PortRef::new(src, "out")));
    let binding = graph.bindings().next().unwrap();
    assert_eq!(Some((0x1000, 0x100)), binding.filter.and_then(|f| f.region));
}

#[test]
fn signature_ignores_insertion_order() {
    let (mut a, src, dst) = pair();
    a.connect(PortRef::new(src, "out"), PortRef::new(dst, "in")).unwrap();
    a.connect(PortRef::new(src, "aux"), PortRef::new(dst, "in")).unwrap();

    let (mut b, src, dst) = pair();
    b.connect(PortRef::new(src, "aux"), PortRef::new(dst, "in")).unwrap();
    b.connect(PortRef::new(src, "out"), PortRef::new(dst, "in")).unwrap();

    assert_eq!(a.signature(), b.signature());
    assert_eq!(
        ("src.aux".to_string(), "dst.in".to_string(), None),
        a.signature()[0]
    );
}

#[test]
fn default_filter_has_no_region() {
    let filter = AddressFilter::default_output();
    assert_eq!(None, filter.region);
    assert!(!filter.rebase);
}

#[test]
fn find_component_by_name() {
    let (graph, _, dst) = pair();
    assert_eq!(Some(dst), graph.find_component("dst"));
    assert_eq!(None, graph.find_component("ghost"));
}
