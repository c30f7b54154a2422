//! `asct inspect`: duplicate audit and lookups over an exported node table.

use std::io::{self, Write};
use std::path::PathBuf;

use asct_core::graph::NodeAttrs;
use asct_core::inspect::{NodeQuery, NodeTable};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `asct inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Node table written by `asct build`.
    #[arg(long)]
    pub nodes: PathBuf,

    /// Show nodes with this exact name.
    #[arg(long)]
    pub name: Option<String>,

    /// Show nodes with this ontology id.
    #[arg(long)]
    pub ontology_id: Option<String>,

    /// Show rows of this organ whose ontology id appears on several rows.
    #[arg(long, value_name = "ORGAN")]
    pub shared_in: Option<String>,

    /// Maximum rows shown for --shared-in.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    rows: usize,
    duplicate_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<NodeAttrs>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared: Option<Shared>,
}

#[derive(Debug, Serialize)]
struct Shared {
    organ: String,
    nodes: Vec<NodeAttrs>,
}

/// Execute `asct inspect`.
pub fn run_inspect(args: &InspectArgs, output: OutputMode) -> anyhow::Result<()> {
    // Validate the lookup before touching the file.
    let query = NodeQuery::from_options(args.name.clone(), args.ontology_id.clone())?;
    let table = NodeTable::from_path(&args.nodes)?;

    let payload = InspectOutput {
        rows: table.len(),
        duplicate_rows: table.duplicate_rows(),
        matches: query
            .as_ref()
            .map(|query| table.find(query).into_iter().cloned().collect()),
        shared: args.shared_in.as_ref().map(|organ| Shared {
            organ: organ.clone(),
            nodes: table
                .shared_in_organ(organ, args.limit)
                .into_iter()
                .cloned()
                .collect(),
        }),
    };

    render_mode(output, &payload, render_inspect_text, render_inspect_pretty)
}

fn write_node_row(w: &mut dyn Write, node: &NodeAttrs) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}",
        node.id, node.name, node.item_type, node.organ, node.ontology_id
    )
}

fn render_inspect_text(payload: &InspectOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "rows={}", payload.rows)?;
    writeln!(w, "duplicate_rows={}", payload.duplicate_rows)?;
    if let Some(matches) = &payload.matches {
        writeln!(w, "matches={}", matches.len())?;
        for node in matches {
            write_node_row(w, node)?;
        }
    }
    if let Some(shared) = &payload.shared {
        writeln!(w, "shared_in={} count={}", shared.organ, shared.nodes.len())?;
        for node in &shared.nodes {
            write_node_row(w, node)?;
        }
    }
    Ok(())
}

fn render_inspect_pretty(payload: &InspectOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Node table")?;
    pretty_kv(w, "rows", payload.rows.to_string())?;
    pretty_kv(w, "duplicate rows", payload.duplicate_rows.to_string())?;

    if let Some(matches) = &payload.matches {
        writeln!(w)?;
        pretty_section(w, &format!("Matches ({})", matches.len()))?;
        if matches.is_empty() {
            writeln!(w, "No matching nodes.")?;
        }
        for node in matches {
            write_node_row(w, node)?;
        }
    }

    if let Some(shared) = &payload.shared {
        writeln!(w)?;
        pretty_section(
            w,
            &format!("Shared ontology ids in {} ({})", shared.organ, shared.nodes.len()),
        )?;
        if shared.nodes.is_empty() {
            writeln!(w, "No shared ontology ids.")?;
        }
        for node in &shared.nodes {
            write_node_row(w, node)?;
        }
    }
    Ok(())
}
