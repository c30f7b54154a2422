//! Secondary (overlay) network construction.
//!
//! Some organ tables, notably the vasculature, describe a network rather
//! than a hierarchy and refer to entities already placed throughout the
//! primary graph. Their paths are not inserted into the primary graph.
//! Instead each item is looked up by ontology id among the primary nodes,
//! and every combination of matching endpoints becomes a candidate edge of a
//! separate overlay graph.
//!
//! ## Edge Rules
//!
//! For a consecutive pair `(s, t)` and candidate primary nodes `ps`, `pt`:
//!
//! - `pt` is a cell type: the edge is added only if `ps -> pt` is already a
//!   primary edge. Cell type parentage is never invented by the overlay.
//! - `pt` is an anatomical structure: the edge is always added.
//!
//! Self-loops and repeated edges are skipped. The overlay may be cyclic and
//! is not rooted.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::{info, instrument, trace};

use crate::graph::{AsctGraph, EdgeAttrs};
use crate::item::{Item, ItemType};

/// Ontology id to every primary node carrying it, in node insertion order.
///
/// Splitting in the primary builder can give one ontology entity several
/// nodes; all of them are candidate endpoints.
#[derive(Debug, Clone, Default)]
pub struct OntologyIndex {
    by_ontology: HashMap<String, Vec<NodeIndex>>,
}

impl OntologyIndex {
    #[must_use]
    pub fn build(graph: &AsctGraph) -> Self {
        let pg = graph.petgraph();
        let mut by_ontology: HashMap<String, Vec<NodeIndex>> = HashMap::new();
        for idx in pg.node_indices() {
            if let Some(node) = pg.node_weight(idx) {
                by_ontology
                    .entry(node.ontology_id.clone())
                    .or_default()
                    .push(idx);
            }
        }
        Self { by_ontology }
    }

    /// Primary nodes with this ontology id (empty if none).
    #[must_use]
    pub fn lookup(&self, ontology_id: &str) -> &[NodeIndex] {
        self.by_ontology.get(ontology_id).map_or(&[], Vec::as_slice)
    }

    /// Number of ontology ids carried by more than one node.
    #[must_use]
    pub fn shared_count(&self) -> usize {
        self.by_ontology.values().filter(|nodes| nodes.len() > 1).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SecondaryCounters {
    /// Ontology ids with several primary nodes, i.e. split entities.
    pub shared_ontology_ids: usize,
    pub paths: usize,
    pub pairs: usize,
    /// Pairs where either ontology id has no primary node.
    pub unresolved_pairs: usize,
    /// Cell type edges dropped because the primary graph lacks them.
    pub rejected_cell_type_edges: usize,
    pub self_loops_skipped: usize,
    pub existing_edges_skipped: usize,
}

/// Builds the overlay against a finished primary graph.
///
/// Holds a shared borrow of the primary graph, which it never mutates.
#[derive(Debug)]
pub struct SecondaryBuilder<'a> {
    primary: &'a AsctGraph,
    index: OntologyIndex,
    graph: AsctGraph,
    counters: SecondaryCounters,
}

impl<'a> SecondaryBuilder<'a> {
    #[must_use]
    pub fn new(primary: &'a AsctGraph) -> Self {
        let index = OntologyIndex::build(primary);
        let counters = SecondaryCounters {
            shared_ontology_ids: index.shared_count(),
            ..SecondaryCounters::default()
        };
        Self {
            primary,
            index,
            graph: AsctGraph::new(),
            counters,
        }
    }

    /// Add the consecutive pairs of one path.
    pub fn add_path(&mut self, path: &[Item]) {
        self.counters.paths += 1;
        for pair in path.windows(2) {
            self.add_pair(&pair[0], &pair[1]);
        }
    }

    #[instrument(skip_all)]
    pub fn add_paths<'p, I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = &'p [Item]>,
    {
        for path in paths {
            self.add_path(path);
        }
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            unresolved = self.counters.unresolved_pairs,
            "secondary network built"
        );
    }

    fn add_pair(&mut self, source: &Item, target: &Item) {
        self.counters.pairs += 1;
        let sources = self.index.lookup(&source.ontology_id);
        let targets = self.index.lookup(&target.ontology_id);
        if sources.is_empty() || targets.is_empty() {
            self.counters.unresolved_pairs += 1;
            trace!(source = %source.ontology_id, target = %target.ontology_id, "unresolved pair");
            return;
        }

        let pg = self.primary.petgraph();
        for &ps in sources {
            for &pt in targets {
                if ps == pt {
                    self.counters.self_loops_skipped += 1;
                    continue;
                }
                let (Some(source_node), Some(target_node)) = (pg.node_weight(ps), pg.node_weight(pt))
                else {
                    continue;
                };

                if target_node.item_type == ItemType::CellType && !pg.contains_edge(ps, pt) {
                    self.counters.rejected_cell_type_edges += 1;
                    continue;
                }

                let s = self.graph.add_node(source_node.clone());
                let t = self.graph.add_node(target_node.clone());
                let added = self.graph.insert_edge(
                    s,
                    t,
                    EdgeAttrs {
                        organ: target.organ.clone(),
                        source: source_node.id.clone(),
                        target: target_node.id.clone(),
                        source_type: source_node.item_type,
                        target_type: target_node.item_type,
                    },
                );
                if !added {
                    self.counters.existing_edges_skipped += 1;
                }
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> SecondaryNetwork {
        SecondaryNetwork {
            graph: self.graph,
            counters: self.counters,
        }
    }
}

/// A finished overlay network.
#[derive(Debug, Clone)]
pub struct SecondaryNetwork {
    pub graph: AsctGraph,
    pub counters: SecondaryCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_item(id: &str, ontology_id: &str, organ: &str) -> Item {
        Item::new(id, id, ItemType::AnatomicalStructure, organ, ontology_id)
    }

    fn ct_item(id: &str, ontology_id: &str, organ: &str) -> Item {
        Item::new(id, id, ItemType::CellType, organ, ontology_id)
    }

    /// R -> heart -> LA, and a split copy LA$$1 under lung; LA -> cm (cell type).
    fn primary() -> AsctGraph {
        let mut graph = AsctGraph::new();
        let root = as_item("R", "R", "body");
        let heart = as_item("heart", "heart", "heart");
        let lung = as_item("lung", "lung", "lung");
        let la = as_item("LA", "LA", "heart");
        let la_split = as_item("LA$$1", "LA", "lung");
        let cm = ct_item("cm", "cm", "heart");
        graph.add_edge(&root, &heart);
        graph.add_edge(&root, &lung);
        graph.add_edge(&heart, &la);
        graph.add_edge(&lung, &la_split);
        graph.add_edge(&la, &cm);
        graph
    }

    #[test]
    fn index_maps_ontology_to_all_nodes() {
        let graph = primary();
        let index = OntologyIndex::build(&graph);
        assert_eq!(index.lookup("LA").len(), 2);
        assert_eq!(index.lookup("heart").len(), 1);
        assert!(index.lookup("missing").is_empty());
        assert_eq!(index.shared_count(), 1);
    }

    #[test]
    fn anatomical_edges_fan_out_to_every_split_copy() {
        let graph = primary();
        let mut builder = SecondaryBuilder::new(&graph);
        builder.add_path(&[
            as_item("x", "heart", "blood_vasculature"),
            as_item("y", "LA", "blood_vasculature"),
        ]);
        let network = builder.finish();
        assert_eq!(network.counters.shared_ontology_ids, 1);
        assert!(network.graph.contains_edge("heart", "LA"));
        assert!(network.graph.contains_edge("heart", "LA$$1"));
        assert_eq!(network.graph.edge_count(), 2);
        let edge = network.graph.edges()[0];
        assert_eq!(edge.organ, "blood_vasculature");
    }

    #[test]
    fn cell_type_edges_mirror_primary_parentage() {
        let graph = primary();
        let mut builder = SecondaryBuilder::new(&graph);
        builder.add_path(&[
            as_item("y", "LA", "blood_vasculature"),
            ct_item("z", "cm", "blood_vasculature"),
        ]);
        let network = builder.finish();
        assert!(network.graph.contains_edge("LA", "cm"));
        assert!(!network.graph.contains_edge("LA$$1", "cm"));
        assert_eq!(network.counters.rejected_cell_type_edges, 1);
    }

    #[test]
    fn unresolved_pairs_are_counted() {
        let graph = primary();
        let mut builder = SecondaryBuilder::new(&graph);
        builder.add_path(&[
            as_item("a", "aorta", "blood_vasculature"),
            as_item("y", "heart", "blood_vasculature"),
        ]);
        let network = builder.finish();
        assert_eq!(network.counters.unresolved_pairs, 1);
        assert_eq!(network.graph.node_count(), 0);
    }

    #[test]
    fn overlay_may_introduce_cycles_without_touching_primary() {
        let graph = primary();
        let before = graph.edge_count();
        let mut builder = SecondaryBuilder::new(&graph);
        builder.add_path(&[
            as_item("a", "heart", "blood_vasculature"),
            as_item("b", "lung", "blood_vasculature"),
            as_item("c", "heart", "blood_vasculature"),
        ]);
        builder.add_path(&[
            as_item("a", "heart", "blood_vasculature"),
            as_item("b", "lung", "blood_vasculature"),
        ]);
        let network = builder.finish();
        assert!(network.graph.contains_edge("heart", "lung"));
        assert!(network.graph.contains_edge("lung", "heart"));
        assert!(crate::diagnostics::has_cycles(&network.graph));
        assert_eq!(network.counters.existing_edges_skipped, 1);
        assert_eq!(graph.edge_count(), before);
    }

    #[test]
    fn same_ontology_pair_skips_self_loops_only() {
        let graph = primary();
        let mut builder = SecondaryBuilder::new(&graph);
        builder.add_path(&[
            as_item("p", "LA", "blood_vasculature"),
            as_item("q", "LA", "blood_vasculature"),
        ]);
        let network = builder.finish();
        assert_eq!(network.counters.self_loops_skipped, 2);
        assert!(network.graph.contains_edge("LA", "LA$$1"));
        assert!(network.graph.contains_edge("LA$$1", "LA"));
    }
}
