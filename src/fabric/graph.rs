use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::base::{AddressRegion, TopologyError, TopologyResult};
use crate::fabric::types::{BindingId, ComponentId, PortRef};

/// Address filter carried by a router output binding. `region == None` marks the router's
/// default output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AddressFilter {
    pub region: Option<(u64, u64)>,
    pub rebase: bool,
    pub fallback: bool,
}

impl AddressFilter {
    pub fn mapping(region: AddressRegion, rebase: bool, fallback: bool) -> Self {
        Self {
            region: Some((region.base(), region.size())),
            rebase,
            fallback,
        }
    }

    pub fn default_output() -> Self {
        Self {
            region: None,
            rebase: false,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentNode<K> {
    pub name: String,
    pub kind: K,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub src: PortRef,
    pub dst: PortRef,
    pub filter: Option<AddressFilter>,
}

/// Port-to-port binding graph. Grown by the cluster builder, then frozen inside the
/// assembled topology where only the read accessors are reachable.
#[derive(Debug, Clone, Serialize)]
pub struct BindingGraph<K> {
    components: Vec<ComponentNode<K>>,
    bindings: Vec<Binding>,
    #[serde(skip)]
    outgoing: HashMap<PortRef, Vec<BindingId>>,
    #[serde(skip)]
    incoming: HashMap<PortRef, Vec<BindingId>>,
}

impl<K> Default for BindingGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> BindingGraph<K> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            bindings: Vec::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    pub fn add_component<I, S>(&mut self, name: impl Into<String>, kind: K, ports: I) -> ComponentId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.components.len();
        self.components.push(ComponentNode {
            name: name.into(),
            kind,
            ports: ports.into_iter().map(Into::into).collect(),
        });
        id
    }

    /// Look up a declared port on a component.
    pub fn port(&self, component: ComponentId, port: &str) -> TopologyResult<PortRef> {
        let node = self.components.get(component).ok_or_else(|| {
            TopologyError::configuration(format!("no component with id {component}"))
        })?;
        if node.ports.iter().any(|p| p == port) {
            Ok(PortRef::new(component, port))
        } else {
            Err(TopologyError::UnknownPort {
                component: node.name.clone(),
                port: port.to_string(),
            })
        }
    }

    fn connect_internal(
        &mut self,
        src: PortRef,
        dst: PortRef,
        filter: Option<AddressFilter>,
    ) -> TopologyResult<BindingId> {
        self.port(src.component, &src.port)?;
        self.port(dst.component, &dst.port)?;
        debug!(
            "bind {} -> {}{}",
            self.qualified(&src),
            self.qualified(&dst),
            match &filter {
                Some(AddressFilter {
                    region: Some((base, size)),
                    rebase,
                    ..
                }) => format!(" [{base:#x}+{size:#x}, rebase={rebase}]"),
                Some(_) => " [default]".to_string(),
                None => String::new(),
            }
        );
        let id = self.bindings.len();
        self.outgoing.entry(src.clone()).or_default().push(id);
        self.incoming.entry(dst.clone()).or_default().push(id);
        self.bindings.push(Binding { src, dst, filter });
        Ok(id)
    }

    pub fn connect(&mut self, src: PortRef, dst: PortRef) -> TopologyResult<BindingId> {
        self.connect_internal(src, dst, None)
    }

    pub fn connect_filtered(
        &mut self,
        src: PortRef,
        dst: PortRef,
        filter: AddressFilter,
    ) -> TopologyResult<BindingId> {
        self.connect_internal(src, dst, Some(filter))
    }

    pub fn component(&self, id: ComponentId) -> &ComponentNode<K> {
        &self.components[id]
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn num_bindings(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn bindings_from<'a>(&'a self, port: &PortRef) -> impl Iterator<Item = &'a Binding> + 'a {
        self.outgoing
            .get(port)
            .into_iter()
            .flatten()
            .map(move |&id| &self.bindings[id])
    }

    pub fn bindings_to<'a>(&'a self, port: &PortRef) -> impl Iterator<Item = &'a Binding> + 'a {
        self.incoming
            .get(port)
            .into_iter()
            .flatten()
            .map(move |&id| &self.bindings[id])
    }

    /// Single unfiltered peer of an output port, if the port is bound.
    pub fn follow(&self, port: &PortRef) -> Option<&PortRef> {
        self.bindings_from(port)
            .find(|binding| binding.filter.is_none())
            .map(|binding| &binding.dst)
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components.iter().position(|node| node.name == name)
    }

    /// `component.port` with the component's instance name.
    pub fn qualified(&self, port: &PortRef) -> String {
        match self.components.get(port.component) {
            Some(node) => format!("{}.{}", node.name, port.port),
            None => port.to_string(),
        }
    }

    /// Identity-free, order-independent description of every binding. Two graphs with equal
    /// signatures wire the same ports together.
    pub fn signature(&self) -> Vec<(String, String, Option<AddressFilter>)> {
        let mut sig: Vec<_> = self
            .bindings
            .iter()
            .map(|b| (self.qualified(&b.src), self.qualified(&b.dst), b.filter))
            .collect();
        sig.sort();
        sig
    }
}
