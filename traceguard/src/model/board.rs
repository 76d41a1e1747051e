//! Per-board connectivity store.
//!
//! Each PCB netlist is held as a graph of component and net nodes joined by
//! pin edges, plus hash indexes for constant-time lookup. Net membership
//! order and per-refdes pin order follow the source file, which keeps
//! traversal and report output deterministic.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Node type in a board graph
#[derive(Debug, Clone)]
pub enum BoardNode {
    /// A placed component (connector, resistor, IC, ...)
    Component(Component),

    /// A net node (an equipotential conductor)
    Net(Net),
}

impl BoardNode {
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            BoardNode::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_net(&self) -> Option<&Net> {
        match self {
            BoardNode::Net(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_component_mut(&mut self) -> Option<&mut Component> {
        match self {
            BoardNode::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_net_mut(&mut self) -> Option<&mut Net> {
        match self {
            BoardNode::Net(n) => Some(n),
            _ => None,
        }
    }
}

/// A component instance on a board.
#[derive(Debug, Clone)]
pub struct Component {
    /// Reference designator (`R10`, `U3`, `J1`).
    pub refdes: String,

    /// Part type from the `*PART*` section. Refdeses discovered only
    /// through connection lines have none.
    pub part_type: Option<String>,

    /// Pins in listing order, deduplicated.
    pub pins: Vec<String>,
}

impl Component {
    pub fn new(refdes: impl Into<String>) -> Self {
        Self {
            refdes: refdes.into(),
            part_type: None,
            pins: Vec::new(),
        }
    }
}

/// A named net and its membership.
#[derive(Debug, Clone)]
pub struct Net {
    pub name: String,

    /// `Ref.Pin` members in source order.
    pub members: Vec<String>,

    /// Rail voltage when this net is a supply (0.0 for grounds).
    pub rail: Option<f64>,
}

impl Net {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            rail: None,
        }
    }
}

/// Edge from a component node to the net one of its pins lands on.
#[derive(Debug, Clone)]
pub struct PinEdge {
    pub pin: String,
}

/// Connectivity store for one PCB.
#[derive(Debug, Clone, Default)]
pub struct Board {
    /// The underlying graph structure
    graph: DiGraph<BoardNode, PinEdge>,

    /// Index mapping: refdes -> node index
    component_indices: HashMap<String, NodeIndex>,

    /// Index mapping: net name -> node index
    net_indices: HashMap<String, NodeIndex>,

    /// Inverse membership: `Ref.Pin` -> net name. Single-valued; each pin
    /// belongs to exactly one net on its board.
    ref_pin: HashMap<String, String>,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a part type for a refdes, creating the component if needed.
    /// A repeated `*PART*` line overwrites the type.
    pub fn add_part(&mut self, refdes: &str, part_type: &str) {
        let idx = self.component_index(refdes);
        if let Some(c) = self.graph[idx].as_component_mut() {
            c.part_type = Some(part_type.to_string());
        }
    }

    /// Introduce a net. A re-declared net restarts with empty membership.
    pub fn declare_signal(&mut self, name: &str) {
        let idx = self.net_index(name);
        if let Some(n) = self.graph[idx].as_net_mut() {
            n.members.clear();
        }
    }

    /// Attach a `Ref.Pin` token to a net: membership, inverse map, refdes
    /// pin list, and the component-to-net edge.
    pub fn attach_pin(&mut self, signal: &str, ref_pin: &str) {
        let Some((refdes, pin)) = ref_pin.split_once('.') else {
            tracing::warn!("Skipping malformed pin token {:?} on {}", ref_pin, signal);
            return;
        };
        let refdes = refdes.to_string();
        let pin = pin.to_string();

        let net_idx = self.net_index(signal);
        if let Some(n) = self.graph[net_idx].as_net_mut() {
            n.members.push(ref_pin.to_string());
        }
        self.ref_pin.insert(ref_pin.to_string(), signal.to_string());

        let comp_idx = self.component_index(&refdes);
        if let Some(c) = self.graph[comp_idx].as_component_mut() {
            if !c.pins.contains(&pin) {
                c.pins.push(pin.clone());
            }
        }
        self.graph.add_edge(comp_idx, net_idx, PinEdge { pin });
    }

    /// Mark a net as a supply rail. Returns false when the net is unknown.
    pub fn set_rail(&mut self, signal: &str, volts: f64) -> bool {
        match self.net_indices.get(signal) {
            Some(&idx) => {
                if let Some(n) = self.graph[idx].as_net_mut() {
                    n.rail = Some(volts);
                }
                true
            }
            None => false,
        }
    }

    /// Rail voltage of a net, if it is one.
    pub fn rail_voltage(&self, signal: &str) -> Option<f64> {
        self.get_net(signal).and_then(|n| n.rail)
    }

    /// The net a `Ref.Pin` belongs to.
    pub fn signal_of(&self, ref_pin: &str) -> Option<&str> {
        self.ref_pin.get(ref_pin).map(String::as_str)
    }

    /// Net membership in source order.
    pub fn members_of(&self, signal: &str) -> Option<&[String]> {
        self.get_net(signal).map(|n| n.members.as_slice())
    }

    /// Part type of a refdes, when the `*PART*` section declared one.
    pub fn part_type(&self, refdes: &str) -> Option<&str> {
        self.get_component(refdes)
            .and_then(|c| c.part_type.as_deref())
    }

    /// Pins of a refdes in listing order.
    pub fn pins_of(&self, refdes: &str) -> Option<&[String]> {
        self.get_component(refdes).map(|c| c.pins.as_slice())
    }

    pub fn has_signal(&self, signal: &str) -> bool {
        self.net_indices.contains_key(signal)
    }

    /// Get a component by reference designator
    pub fn get_component(&self, refdes: &str) -> Option<&Component> {
        self.component_indices
            .get(refdes)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(|n| n.as_component())
    }

    /// Get a net by name
    pub fn get_net(&self, name: &str) -> Option<&Net> {
        self.net_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(|n| n.as_net())
    }

    /// All nets in declaration order
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.graph.node_weights().filter_map(|n| n.as_net())
    }

    /// Get statistics about the board
    pub fn stats(&self) -> BoardStats {
        BoardStats {
            component_count: self.component_indices.len(),
            net_count: self.net_indices.len(),
            connection_count: self.graph.edge_count(),
            rail_count: self.nets().filter(|n| n.rail.is_some()).count(),
        }
    }

    fn component_index(&mut self, refdes: &str) -> NodeIndex {
        if let Some(&idx) = self.component_indices.get(refdes) {
            return idx;
        }
        let idx = self
            .graph
            .add_node(BoardNode::Component(Component::new(refdes)));
        self.component_indices.insert(refdes.to_string(), idx);
        idx
    }

    fn net_index(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.net_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(BoardNode::Net(Net::new(name)));
        self.net_indices.insert(name.to_string(), idx);
        idx
    }
}

/// Statistics about a board
#[derive(Debug, Clone)]
pub struct BoardStats {
    pub component_count: usize,
    pub net_count: usize,
    pub connection_count: usize,
    pub rail_count: usize,
}
