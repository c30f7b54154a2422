//! Observational graph diagnostics.
//!
//! Nothing here is enforced; the values are reported for operators.
//!
//! - **is_tree**: non-empty, `edges == nodes - 1` and weakly connected.
//! - **has_cycles**: any directed cycle (self-loops included).
//! - **cycles**: strongly connected components that form cycles, as sorted
//!   id lists.
//! - **multi_parent_nodes**: nodes with in-degree above one, i.e. ontology
//!   entities reachable through more than one parent without being split.
//! - **unreachable_from_root**: nodes with no directed path from the root.
//! - **content_hash**: BLAKE3 of the node and edge tables in export order, so
//!   two runs can be compared without diffing files.

use std::collections::HashSet;

use petgraph::Direction;
use petgraph::algo::{connected_components, is_cyclic_directed, tarjan_scc};
use petgraph::visit::Bfs;
use serde::Serialize;

use crate::graph::AsctGraph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphDiagnostics {
    pub node_count: usize,
    pub edge_count: usize,
    pub is_tree: bool,
    pub has_cycles: bool,
    pub cycle_count: usize,
    pub multi_parent_nodes: usize,
    /// `None` when no root was given (secondary networks have no root).
    pub unreachable_from_root: Option<usize>,
    pub content_hash: String,
}

impl GraphDiagnostics {
    #[must_use]
    pub fn compute(graph: &AsctGraph, root: Option<&str>) -> Self {
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            is_tree: is_tree(graph),
            has_cycles: has_cycles(graph),
            cycle_count: find_all_cycles(graph).len(),
            multi_parent_nodes: multi_parent_nodes(graph),
            unreachable_from_root: root.map(|root| unreachable_from(graph, root).len()),
            content_hash: content_hash(graph),
        }
    }
}

/// Directed tree test: one weakly connected component with `n - 1` edges.
#[must_use]
pub fn is_tree(graph: &AsctGraph) -> bool {
    let nodes = graph.node_count();
    nodes > 0
        && graph.edge_count() == nodes - 1
        && connected_components(graph.petgraph()) == 1
}

#[must_use]
pub fn has_cycles(graph: &AsctGraph) -> bool {
    is_cyclic_directed(graph.petgraph())
}

/// Find all cycles currently present in `graph`.
///
/// Each entry is a sorted list of node ids in one strongly connected
/// component. Self-loops are reported as a one-element cycle.
#[must_use]
pub fn find_all_cycles(graph: &AsctGraph) -> Vec<Vec<String>> {
    let pg = graph.petgraph();
    let mut cycles: Vec<Vec<String>> = tarjan_scc(pg)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| pg.find_edge(node, node).is_some())
        })
        .map(|component| {
            let mut ids: Vec<String> = component
                .into_iter()
                .filter_map(|idx| pg.node_weight(idx).map(|n| n.id.clone()))
                .collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    cycles.sort_unstable();
    cycles
}

#[must_use]
pub fn multi_parent_nodes(graph: &AsctGraph) -> usize {
    let pg = graph.petgraph();
    pg.node_indices()
        .filter(|&idx| pg.neighbors_directed(idx, Direction::Incoming).nth(1).is_some())
        .count()
}

/// Ids of nodes not reachable from `root`, in insertion order.
///
/// An unknown root leaves every node unreachable.
#[must_use]
pub fn unreachable_from(graph: &AsctGraph, root: &str) -> Vec<String> {
    let pg = graph.petgraph();
    let mut reached = HashSet::with_capacity(pg.node_count());
    if let Some(start) = graph.node_index(root) {
        let mut bfs = Bfs::new(pg, start);
        while let Some(idx) = bfs.next(pg) {
            reached.insert(idx);
        }
    }

    pg.node_indices()
        .filter(|idx| !reached.contains(idx))
        .filter_map(|idx| pg.node_weight(idx).map(|n| n.id.clone()))
        .collect()
}

/// BLAKE3 of every node and edge row in export order.
#[must_use]
pub fn content_hash(graph: &AsctGraph) -> String {
    let mut hasher = blake3::Hasher::new();
    for node in graph.nodes() {
        for field in [
            node.id.as_str(),
            node.name.as_str(),
            node.item_type.as_str(),
            node.organ.as_str(),
            node.ontology_id.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\x00");
        }
        hasher.update(b"\x01");
    }
    hasher.update(b"\x02");
    for edge in graph.edges() {
        for field in [
            edge.organ.as_str(),
            edge.source.as_str(),
            edge.target.as_str(),
            edge.source_type.as_str(),
            edge.target_type.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\x00");
        }
        hasher.update(b"\x01");
    }
    format!("blake3:{}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemType};

    fn item(id: &str) -> Item {
        Item::new(id, id, ItemType::AnatomicalStructure, "kidney", id)
    }

    fn build_graph(edges: &[(&str, &str)]) -> AsctGraph {
        let mut graph = AsctGraph::new();
        for (source, target) in edges {
            graph.add_edge(&item(source), &item(target));
        }
        graph
    }

    #[test]
    fn chain_is_a_tree() {
        let graph = build_graph(&[("R", "A"), ("A", "B"), ("R", "C")]);
        let diag = GraphDiagnostics::compute(&graph, Some("R"));
        assert!(diag.is_tree);
        assert!(!diag.has_cycles);
        assert_eq!(diag.cycle_count, 0);
        assert_eq!(diag.multi_parent_nodes, 0);
        assert_eq!(diag.unreachable_from_root, Some(0));
        assert_eq!(diag.node_count, 4);
        assert_eq!(diag.edge_count, 3);
    }

    #[test]
    fn diamond_is_not_a_tree_but_acyclic() {
        let graph = build_graph(&[("R", "A"), ("R", "B"), ("A", "C"), ("B", "C")]);
        assert!(!is_tree(&graph));
        assert!(!has_cycles(&graph));
        assert_eq!(multi_parent_nodes(&graph), 1);
    }

    #[test]
    fn disconnected_forest_is_not_a_tree() {
        let mut graph = build_graph(&[("R", "A")]);
        graph.add_item(&item("lonely"));
        // 3 nodes, 1 edge.
        assert!(!is_tree(&graph));
        assert_eq!(unreachable_from(&graph, "R"), vec!["lonely".to_string()]);
    }

    #[test]
    fn empty_graph_is_not_a_tree() {
        assert!(!is_tree(&AsctGraph::new()));
    }

    #[test]
    fn cycles_detected_and_listed() {
        let graph = build_graph(&[("A", "B"), ("B", "A"), ("B", "C"), ("C", "C")]);
        assert!(has_cycles(&graph));
        assert_eq!(
            find_all_cycles(&graph),
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["C".to_string()],
            ]
        );
    }

    #[test]
    fn unknown_root_leaves_everything_unreachable() {
        let graph = build_graph(&[("A", "B")]);
        assert_eq!(unreachable_from(&graph, "nope").len(), 2);
    }

    #[test]
    fn content_hash_is_stable_and_order_sensitive() {
        let a = build_graph(&[("R", "A"), ("R", "B")]);
        let b = build_graph(&[("R", "A"), ("R", "B")]);
        let c = build_graph(&[("R", "B"), ("R", "A")]);
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_ne!(content_hash(&a), content_hash(&c));
        assert!(content_hash(&a).starts_with("blake3:"));
    }
}
