use asct_core::builder::GraphBuilder;
use asct_core::diagnostics::unreachable_from;
use asct_core::graph::AsctGraph;
use asct_core::item::{Item, ItemType, temp_code};
use proptest::prelude::*;
use std::collections::HashSet;

const ROOT: &str = "UBERON:0013702";
const ORGANS: [&str; 3] = ["kidney", "heart", "blood_vasculature"];

/// Paths over a small id alphabet so collisions, merges and splits are common.
fn arb_paths() -> impl Strategy<Value = Vec<Vec<(u8, bool)>>> {
    prop::collection::vec(prop::collection::vec((0u8..6, any::<bool>()), 0..6), 1..16)
}

fn to_items(paths: &[Vec<(u8, bool)>]) -> Vec<Vec<Item>> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            path.iter()
                .map(|&(n, cell_type)| {
                    let id = format!("N:{n}");
                    let item_type = if cell_type {
                        ItemType::CellType
                    } else {
                        ItemType::AnatomicalStructure
                    };
                    Item::new(id.clone(), id.clone(), item_type, ORGANS[i % ORGANS.len()], id)
                })
                .collect()
        })
        .collect()
}

fn build(paths: &[Vec<(u8, bool)>]) -> (AsctGraph, usize) {
    let mut builder = GraphBuilder::new(Item::body(ROOT, "body"));
    builder.add_paths(to_items(paths));
    let built = builder.finish();
    (built.graph, built.counters.duplicates)
}

fn rows(graph: &AsctGraph) -> (Vec<String>, Vec<(String, String)>) {
    let nodes = graph.nodes().map(|n| n.id.clone()).collect();
    let edges = graph
        .edges()
        .into_iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    (nodes, edges)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn slug_uses_only_the_slug_alphabet(name in "\\PC{0,24}") {
        let code = temp_code("ASCTB-TEMP", &name);
        let slug = code.strip_prefix("ASCTB-TEMP:").expect("namespace prefix");
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!slug.starts_with('-'));
        prop_assert!(!slug.ends_with('-'));
    }

    #[test]
    fn slug_ignores_case_and_edge_punctuation(
        name in "[A-Za-z0-9 _.,!?-]{0,20}",
        prefix in "[ !?.,-]{0,4}",
        suffix in "[ !?.,-]{0,4}",
    ) {
        let plain = temp_code("T", &name);
        prop_assert_eq!(&plain, &temp_code("T", &name.to_uppercase()));
        prop_assert_eq!(&plain, &temp_code("T", &format!("{prefix}{name}{suffix}")));
    }

    #[test]
    fn every_node_is_reachable_from_root(paths in arb_paths()) {
        let (graph, _) = build(&paths);
        prop_assert!(unreachable_from(&graph, ROOT).is_empty());
    }

    #[test]
    fn no_repeated_edges(paths in arb_paths()) {
        let (graph, _) = build(&paths);
        let (_, edges) = rows(&graph);
        let unique: HashSet<&(String, String)> = edges.iter().collect();
        prop_assert_eq!(unique.len(), edges.len());
        prop_assert_eq!(edges.len(), graph.edge_count());
    }

    #[test]
    fn duplicate_counter_matches_split_nodes(paths in arb_paths()) {
        let (graph, duplicates) = build(&paths);
        let split_nodes = graph.nodes().filter(|n| n.id.contains("$$")).count();
        prop_assert_eq!(split_nodes, duplicates);
        for node in graph.nodes().filter(|n| n.id.contains("$$")) {
            prop_assert!(node.id.starts_with(&node.ontology_id));
        }
    }

    #[test]
    fn build_is_deterministic(paths in arb_paths()) {
        let (first, first_dups) = build(&paths);
        let (second, second_dups) = build(&paths);
        prop_assert_eq!(rows(&first), rows(&second));
        prop_assert_eq!(first_dups, second_dups);
    }
}
