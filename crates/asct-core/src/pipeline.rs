//! End-to-end build: dataset to primary graph, optional overlay and report.
//!
//! ```text
//! Dataset ──ordered_tables──► PathExtractor ──traversals──► GraphBuilder
//!                                                               │
//!                                secondary organs' traversals   ▼
//!                                ─────────────────────► SecondaryBuilder
//! ```
//!
//! Every table, secondary organs included, feeds the primary graph. The
//! overlay replays only the secondary organs' paths against the finished
//! primary graph.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::builder::{BuildCounters, BuiltGraph, GraphBuilder};
use crate::config::BuildConfig;
use crate::dataset::Dataset;
use crate::diagnostics::GraphDiagnostics;
use crate::error::Result;
use crate::extract::{PathExtractor, ordered_tables};
use crate::item::Item;
use crate::secondary::{SecondaryBuilder, SecondaryCounters, SecondaryNetwork};

/// Summary of one build, for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Tables in processing order.
    pub tables: Vec<String>,
    pub rows: usize,
    pub primary: GraphDiagnostics,
    pub build: BuildCounters,
    pub secondary: Option<SecondaryReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecondaryReport {
    pub diagnostics: GraphDiagnostics,
    pub counters: SecondaryCounters,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub primary: BuiltGraph,
    pub secondary: Option<SecondaryNetwork>,
    pub report: BuildReport,
}

/// Run the whole pipeline over an in-memory dataset.
///
/// # Errors
///
/// Returns [`crate::AsctError::InvalidConfiguration`] for a contradictory
/// configuration and [`crate::AsctError::Extraction`] for the first
/// malformed row.
#[instrument(skip_all, fields(tables = dataset.table_count()))]
pub fn run(dataset: &Dataset, config: &BuildConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let tables = ordered_tables(dataset, &config.organs);
    let extractor = PathExtractor::from_config(config);
    let rows = extractor.extract(dataset, &tables)?;

    let traversals: Vec<(&str, Vec<Item>)> = rows
        .iter()
        .map(|row| (row.table.as_str(), row.traversal(config.include_cell_types)))
        .collect();

    let mut builder = GraphBuilder::new(Item::body(&config.body.id, &config.body.name));
    builder.add_paths(traversals.iter().map(|(_, path)| path.clone()));
    let primary = builder.finish();
    let primary_diagnostics = GraphDiagnostics::compute(&primary.graph, Some(&primary.body.id));

    let secondary = config.secondary.enabled.then(|| {
        for table in &config.secondary.organs {
            if !dataset.contains_table(table) {
                warn!(table = %table, "secondary organ table not present in dataset");
            }
        }
        let organs: HashSet<&str> = config.secondary.organs.iter().map(String::as_str).collect();
        let mut overlay = SecondaryBuilder::new(&primary.graph);
        overlay.add_paths(
            traversals
                .iter()
                .filter(|(table, _)| organs.contains(table))
                .map(|(_, path)| path.as_slice()),
        );
        overlay.finish()
    });

    let report = BuildReport {
        tables: tables.iter().map(ToString::to_string).collect(),
        rows: rows.len(),
        primary: primary_diagnostics,
        build: primary.counters,
        secondary: secondary.as_ref().map(|network| SecondaryReport {
            diagnostics: GraphDiagnostics::compute(&network.graph, None),
            counters: network.counters,
        }),
    };
    info!(
        nodes = report.primary.node_count,
        edges = report.primary.edge_count,
        is_tree = report.primary.is_tree,
        content_hash = %report.primary.content_hash,
        "build complete"
    );

    Ok(PipelineOutput {
        primary,
        secondary,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AsctError;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn record(id: &str, name: &str) -> serde_json::Value {
        json!({ "id": id, "rdfs_label": name, "name": name })
    }

    fn dataset() -> Dataset {
        Dataset::from_value(json!({
            "kidney": { "data": [
                { "anatomical_structures": [record("UBERON:0002113", "kidney")],
                  "cell_types": [record("CL:0000653", "podocyte")] }
            ]},
            "blood-vasculature": { "data": [
                { "anatomical_structures": [
                    record("UBERON:0001637", "artery"),
                    record("UBERON:0002113", "kidney")
                  ],
                  "cell_types": [] }
            ]}
        }))
        .expect("dataset")
    }

    #[test]
    fn precedence_tables_are_built_first() {
        let output = run(&dataset(), &BuildConfig::default()).expect("run");
        assert_eq!(output.report.tables, vec!["blood-vasculature", "kidney"]);
        assert_eq!(output.report.rows, 2);
        let graph = &output.primary.graph;
        assert!(graph.contains_edge("UBERON:0013702", "UBERON:0001637"));
        assert!(graph.contains_edge("UBERON:0001637", "UBERON:0002113"));
        // The kidney row starts at an existing node, so no body edge.
        assert!(!graph.contains_edge("UBERON:0013702", "UBERON:0002113"));
        assert!(graph.contains_edge("UBERON:0002113", "CL:0000653"));
        assert!(output.secondary.is_none());
        assert!(output.report.secondary.is_none());
        assert_eq!(output.report.primary.unreachable_from_root, Some(0));
    }

    #[test]
    fn secondary_overlay_replays_configured_organs() {
        let mut config = BuildConfig::default();
        config.secondary.enabled = true;
        let output = run(&dataset(), &config).expect("run");
        let network = output.secondary.expect("secondary");
        assert!(network.graph.contains_edge("UBERON:0001637", "UBERON:0002113"));
        assert_eq!(network.graph.edge_count(), 1);
        let report = output.report.secondary.expect("report");
        assert_eq!(report.counters.paths, 1);
        assert_eq!(report.diagnostics.unreachable_from_root, None);
    }

    #[test]
    fn invalid_configuration_fails_before_building() {
        let mut config = BuildConfig::default();
        config.secondary.enabled = true;
        config.secondary.organs.clear();
        let err = run(&dataset(), &config).expect_err("invalid");
        assert!(matches!(err, AsctError::InvalidConfiguration(_)));
    }

    #[test]
    fn cell_types_can_be_left_out() {
        let mut config = BuildConfig::default();
        config.include_cell_types = false;
        let output = run(&dataset(), &config).expect("run");
        assert!(!output.primary.graph.contains_node("CL:0000653"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_secondary_table_warns_and_leaves_overlay_empty() {
        let mut config = BuildConfig::default();
        config.secondary.enabled = true;
        config.secondary.organs = vec!["lymph-vasculature".to_string()];

        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        let output =
            tracing::subscriber::with_default(subscriber, || run(&dataset(), &config)).expect("run");

        let network = output.secondary.expect("secondary");
        assert_eq!(network.graph.node_count(), 0);
        assert_eq!(network.counters.paths, 0);

        let logs = String::from_utf8(captured.0.lock().expect("log buffer").clone()).expect("utf8");
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("secondary organ table not present in dataset"), "{logs}");
        assert!(logs.contains("lymph-vasculature"), "{logs}");
    }
}
