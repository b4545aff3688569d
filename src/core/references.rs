//! Reverse index of foreign key references
//!
//! A directed graph with one node per field taking part in a connection and an
//! edge `foreign -> primary` for every pk_ref. Looking up who references a
//! primary field walks incoming edges instead of scanning every table.

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};

use crate::core::schema::FieldRef;

pub type ReferenceGraph = StableGraph<FieldRef, (), Directed>;

#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    graph: ReferenceGraph,
    nodes: HashMap<FieldRef, NodeIndex>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, field: &FieldRef) -> NodeIndex {
        if let Some(idx) = self.nodes.get(field) {
            return *idx;
        }
        let idx = self.graph.add_node(field.clone());
        self.nodes.insert(field.clone(), idx);
        idx
    }

    /// Record `foreign -> primary`, replacing any previous target of `foreign`
    pub fn link(&mut self, foreign: &FieldRef, primary: &FieldRef) {
        self.unlink(foreign);
        let from = self.node(foreign);
        let to = self.node(primary);
        self.graph.add_edge(from, to, ());
    }

    /// Drop the outgoing reference of `foreign`, if any
    pub fn unlink(&mut self, foreign: &FieldRef) {
        let Some(&idx) = self.nodes.get(foreign) else {
            return;
        };
        let targets: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        for target in targets {
            if let Some(edge) = self.graph.find_edge(idx, target) {
                self.graph.remove_edge(edge);
            }
            self.prune(target);
        }
        self.prune(idx);
    }

    /// Remove a field together with every edge touching it
    pub fn forget(&mut self, field: &FieldRef) {
        let Some(idx) = self.nodes.remove(field) else {
            return;
        };
        let neighbours: Vec<NodeIndex> = self.graph.neighbors_undirected(idx).collect();
        self.graph.remove_node(idx);
        for neighbour in neighbours {
            self.prune(neighbour);
        }
    }

    // Nodes without edges are dropped so the index only holds live connections
    fn prune(&mut self, idx: NodeIndex) {
        let Some(field) = self.graph.node_weight(idx) else {
            return;
        };
        if self.graph.neighbors_undirected(idx).next().is_none() {
            self.nodes.remove(field);
            self.graph.remove_node(idx);
        }
    }

    /// Fields whose pk_ref is `primary`, in no particular order
    pub fn referencers_of(&self, primary: &FieldRef) -> Vec<FieldRef> {
        let Some(&idx) = self.nodes.get(primary) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect()
    }

    /// Current target of `foreign`
    pub fn target_of(&self, foreign: &FieldRef) -> Option<&FieldRef> {
        let idx = self.nodes.get(foreign)?;
        self.graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .next()
            .and_then(|n| self.graph.node_weight(n))
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }

    /// All `(foreign, primary)` pairs
    pub fn connections(&self) -> impl Iterator<Item = (&FieldRef, &FieldRef)> {
        self.graph.edge_indices().filter_map(|e| {
            let (from, to) = self.graph.edge_endpoints(e)?;
            Some((self.graph.node_weight(from)?, self.graph.node_weight(to)?))
        })
    }
}
