//! Attributed directed graph keyed by working node id.
//!
//! # Overview
//!
//! [`AsctGraph`] wraps a [`petgraph`] `DiGraph` whose node weights carry the
//! exported node attributes and whose edge weights carry the exported edge
//! attributes. A side map resolves working ids to `NodeIndex`.
//!
//! ## Invariants
//!
//! - One node per working id; node attributes are fixed at insertion.
//! - At most one edge per ordered `(source, target)` pair. Re-inserting an
//!   existing edge is a no-op and keeps the original attributes.
//! - Nodes and edges are never removed.
//!
//! ## Iteration Order
//!
//! Nodes iterate in insertion order. Edges iterate grouped by source node
//! (in node insertion order) and, within one source, in insertion order.
//! Exports rely on this for reproducible row order.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemType};

/// Node attributes as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub organ: String,
    pub ontology_id: String,
}

impl From<&Item> for NodeAttrs {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            item_type: item.item_type,
            organ: item.organ.clone(),
            ontology_id: item.ontology_id.clone(),
        }
    }
}

/// Edge attributes as exported.
///
/// `organ` is the organ in which the edge was observed, taken from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    pub organ: String,
    pub source: String,
    pub target: String,
    pub source_type: ItemType,
    pub target_type: ItemType,
}

#[derive(Debug, Clone, Default)]
pub struct AsctGraph {
    graph: DiGraph<NodeAttrs, EdgeAttrs>,
    node_map: HashMap<String, NodeIndex>,
}

impl AsctGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same id exists.
    ///
    /// Returns the index of the (new or existing) node.
    pub fn add_node(&mut self, attrs: NodeAttrs) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&attrs.id) {
            return idx;
        }
        let id = attrs.id.clone();
        let idx = self.graph.add_node(attrs);
        self.node_map.insert(id, idx);
        idx
    }

    /// Insert the node for `item` unless its working id is taken.
    pub fn add_item(&mut self, item: &Item) -> NodeIndex {
        self.add_node(NodeAttrs::from(item))
    }

    /// Insert the edge `source -> target` with attributes derived from the two
    /// items, adding missing endpoint nodes first.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, source: &Item, target: &Item) -> bool {
        let source_idx = self.add_item(source);
        let target_idx = self.add_item(target);
        self.insert_edge(
            source_idx,
            target_idx,
            EdgeAttrs {
                organ: target.organ.clone(),
                source: source.id.clone(),
                target: target.id.clone(),
                source_type: source.item_type,
                target_type: target.item_type,
            },
        )
    }

    /// Insert an edge between existing nodes with explicit attributes.
    ///
    /// Returns `false` if the edge already existed.
    pub fn insert_edge(&mut self, source: NodeIndex, target: NodeIndex, attrs: EdgeAttrs) -> bool {
        // petgraph allows parallel edges; the graph must not.
        if self.graph.contains_edge(source, target) {
            return false;
        }
        self.graph.add_edge(source, target, attrs);
        true
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    #[must_use]
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        match (self.node_map.get(source), self.node_map.get(target)) {
            (Some(&s), Some(&t)) => self.graph.contains_edge(s, t),
            _ => false,
        }
    }

    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.node_index(id).and_then(|idx| self.graph.node_weight(idx))
    }

    /// Direct successors of `id`, in the order their edges were inserted.
    #[must_use]
    pub fn successors(&self, id: &str) -> Vec<&NodeAttrs> {
        let Some(idx) = self.node_index(id) else {
            return Vec::new();
        };
        self.outgoing_in_order(idx)
            .into_iter()
            .filter_map(|edge| {
                let (_, target) = self.graph.edge_endpoints(edge)?;
                self.graph.node_weight(target)
            })
            .collect()
    }

    /// Node attributes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttrs> {
        self.graph.node_weights()
    }

    /// Edge attributes grouped by source node, see the module docs.
    #[must_use]
    pub fn edges(&self) -> Vec<&EdgeAttrs> {
        self.graph
            .node_indices()
            .flat_map(|idx| self.outgoing_in_order(idx))
            .filter_map(|edge| self.graph.edge_weight(edge))
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The underlying petgraph graph, for algorithms.
    #[must_use]
    pub const fn petgraph(&self) -> &DiGraph<NodeAttrs, EdgeAttrs> {
        &self.graph
    }

    fn outgoing_in_order(&self, idx: NodeIndex) -> Vec<EdgeIndex> {
        // petgraph walks adjacency lists newest-first.
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| edge.id())
            .collect();
        edges.sort_unstable();
        edges
    }
}
