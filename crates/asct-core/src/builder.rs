//! Primary graph construction.
//!
//! # Overview
//!
//! [`GraphBuilder`] consumes full traversal paths in input order and grows a
//! single graph rooted at the body node. It never revisits or removes earlier
//! decisions, so the result depends on path order; identical ordered input
//! always yields an identical graph.
//!
//! ## Per-path Algorithm
//!
//! 1. If the first item's id is not a node yet, add it under the body root.
//! 2. For each consecutive `(source, target)` pair, skip self-loops and edges
//!    that already exist.
//! 3. If `source` is already a node, decide the target's identity with
//!    [`resolve_target`]:
//!    - **Merge**: `source` already links to a node with the target's
//!      ontology id, so the target becomes that node.
//!    - **Split**: the target's working id exists elsewhere in the graph, so
//!      the target becomes a new node `"{id}$${n}"` where `n` is the
//!      incremented duplicate counter.
//!    - **Keep**: neither applies.
//! 4. Add missing endpoint nodes and the edge.
//!
//! A rebound target id carries over to the next pair, where the target
//! becomes the source; the rest of the path follows the merged or split node.

use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use crate::graph::AsctGraph;
use crate::item::Item;

/// Identity decision for a target item whose source is already in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the target's working id.
    Keep,
    /// Reuse this existing successor of the source.
    Merge(String),
    /// Create a new node with this disambiguated id.
    Split(String),
}

/// Decide the identity of `target` on the edge `source_id -> target`.
///
/// `duplicates` is the number of splits made so far; a split uses
/// `duplicates + 1` as its suffix. When several successors share the target's
/// ontology id, the most recently linked one wins.
#[must_use]
pub fn resolve_target(
    graph: &AsctGraph,
    source_id: &str,
    target: &Item,
    duplicates: usize,
) -> Resolution {
    if let Some(existing) = graph
        .successors(source_id)
        .into_iter()
        .rev()
        .find(|child| child.ontology_id == target.ontology_id)
    {
        return Resolution::Merge(existing.id.clone());
    }

    if graph.contains_node(&target.id) {
        return Resolution::Split(split_id(&target.id, duplicates + 1));
    }

    Resolution::Keep
}

/// Disambiguated id for the `n`-th split.
#[must_use]
pub fn split_id(id: &str, n: usize) -> String {
    format!("{id}$${n}")
}

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildCounters {
    pub paths: usize,
    pub empty_paths: usize,
    /// Number of splits (disambiguated duplicate nodes).
    pub duplicates: usize,
    pub merges: usize,
    pub self_loops_skipped: usize,
    pub existing_edges_skipped: usize,
}

/// Incremental builder for the primary graph.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    graph: AsctGraph,
    body: Item,
    counters: BuildCounters,
}

impl GraphBuilder {
    /// Start a graph containing only `body`.
    #[must_use]
    pub fn new(body: Item) -> Self {
        let mut graph = AsctGraph::new();
        graph.add_item(&body);
        Self {
            graph,
            body,
            counters: BuildCounters::default(),
        }
    }

    /// Add one traversal path.
    pub fn add_path(&mut self, mut path: Vec<Item>) {
        self.counters.paths += 1;

        let Some(first) = path.first() else {
            self.counters.empty_paths += 1;
            debug!("skipping empty path");
            return;
        };
        if !self.graph.contains_node(&first.id) {
            self.graph.add_edge(&self.body, first);
        }

        for i in 1..path.len() {
            let (head, tail) = path.split_at_mut(i);
            let source = &head[i - 1];
            let target = &mut tail[0];

            if source.id == target.id {
                self.counters.self_loops_skipped += 1;
                trace!(id = %source.id, "self-loop skipped");
                continue;
            }
            if self.graph.contains_edge(&source.id, &target.id) {
                self.counters.existing_edges_skipped += 1;
                continue;
            }

            if self.graph.contains_node(&source.id) {
                match resolve_target(&self.graph, &source.id, target, self.counters.duplicates) {
                    Resolution::Keep => {}
                    Resolution::Merge(existing) => {
                        self.counters.merges += 1;
                        trace!(source = %source.id, from = %target.id, to = %existing, "merged target");
                        target.id = existing;
                    }
                    Resolution::Split(split) => {
                        self.counters.duplicates += 1;
                        debug!(
                            source = %source.id,
                            ontology_id = %target.ontology_id,
                            id = %split,
                            organ = %target.organ,
                            "split duplicate node"
                        );
                        target.id = split;
                    }
                }
            } else {
                self.graph.add_item(source);
            }

            self.graph.add_item(target);
            self.graph.add_edge(source, target);
        }
    }

    /// Add paths in iteration order.
    #[instrument(skip_all)]
    pub fn add_paths<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = Vec<Item>>,
    {
        for path in paths {
            self.add_path(path);
        }
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            duplicates = self.counters.duplicates,
            "primary graph built"
        );
    }

    #[must_use]
    pub const fn graph(&self) -> &AsctGraph {
        &self.graph
    }

    #[must_use]
    pub const fn duplicates(&self) -> usize {
        self.counters.duplicates
    }

    #[must_use]
    pub fn finish(self) -> BuiltGraph {
        BuiltGraph {
            graph: self.graph,
            body: self.body,
            counters: self.counters,
        }
    }
}

/// A finished primary graph.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: AsctGraph,
    pub body: Item,
    pub counters: BuildCounters,
}
