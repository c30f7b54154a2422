//! Graph export.
//!
//! - Node table: `id, name, type, organ, ontology_id`
//! - Edge table: `organ, source, target, source_type, target_type`
//! - GraphML with the node attributes `id, label, name, type, organ,
//!   ontology_id` and the edge attributes of the edge table
//! - Graphviz DOT carrying the same attributes
//!
//! Rows follow [`AsctGraph`] iteration order.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{AsctError, Result};
use crate::graph::AsctGraph;

/// Output formats that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Graphml,
    Dot,
}

impl ExportFormat {
    pub const ALL: [Self; 3] = [Self::Csv, Self::Graphml, Self::Dot];
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Graphml => "graphml",
            Self::Dot => "dot",
        })
    }
}

/// File names for one exported graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNames {
    pub nodes_csv: &'static str,
    pub edges_csv: &'static str,
    pub graphml: &'static str,
    pub dot: &'static str,
}

impl ExportNames {
    pub const PRIMARY: Self = Self {
        nodes_csv: "asct-nodes.csv",
        edges_csv: "asct-edges.csv",
        graphml: "asct-tree.graphml",
        dot: "asct-tree.dot",
    };

    pub const SECONDARY: Self = Self {
        nodes_csv: "asct-secondary-nodes.csv",
        edges_csv: "asct-secondary-edges.csv",
        graphml: "asct-secondary.graphml",
        dot: "asct-secondary.dot",
    };
}

const NODE_COLUMNS: [&str; 5] = ["id", "name", "type", "organ", "ontology_id"];
const EDGE_COLUMNS: [&str; 5] = ["organ", "source", "target", "source_type", "target_type"];

/// Write the node table. The header row is written even for an empty graph.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_nodes_csv<W: Write>(graph: &AsctGraph, writer: W) -> Result<()> {
    let mut csv = table_writer(writer, &NODE_COLUMNS)?;
    for node in graph.nodes() {
        csv.serialize(node)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the edge table. The header row is written even for an empty graph.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_edges_csv<W: Write>(graph: &AsctGraph, writer: W) -> Result<()> {
    let mut csv = table_writer(writer, &EDGE_COLUMNS)?;
    for edge in graph.edges() {
        csv.serialize(edge)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn table_writer<W: Write>(writer: W, header: &[&str]) -> Result<csv::Writer<W>> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(header)?;
    Ok(csv)
}

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const NODE_KEYS: [&str; 6] = ["id", "label", "name", "type", "organ", "ontology_id"];

/// Write a directed GraphML document.
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub fn write_graphml<W: Write>(graph: &AsctGraph, w: W) -> io::Result<()> {
    render_graphml(graph, w).map_err(io::Error::other)
}

fn render_graphml<W: Write>(graph: &AsctGraph, w: W) -> quick_xml::Result<()> {
    let mut xml = Writer::new_with_indent(w, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.create_element("graphml")
        .with_attribute(("xmlns", GRAPHML_NS))
        .write_inner_content(|xml| {
            for key in NODE_KEYS {
                write_key(xml, "n", "node", key)?;
            }
            for key in EDGE_COLUMNS {
                write_key(xml, "e", "edge", key)?;
            }
            xml.create_element("graph")
                .with_attribute(("edgedefault", "directed"))
                .write_inner_content(|xml| write_elements(xml, graph))?;
            Ok::<(), quick_xml::Error>(())
        })?;
    xml.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_elements<W: Write>(xml: &mut Writer<W>, graph: &AsctGraph) -> quick_xml::Result<()> {
    for node in graph.nodes() {
        let values = [
            node.id.as_str(),
            node.name.as_str(),
            node.name.as_str(),
            node.item_type.as_str(),
            node.organ.as_str(),
            node.ontology_id.as_str(),
        ];
        xml.create_element("node")
            .with_attribute(("id", node.id.as_str()))
            .write_inner_content(|xml| write_data(xml, "n", &NODE_KEYS, &values))?;
    }

    for edge in graph.edges() {
        let values = [
            edge.organ.as_str(),
            edge.source.as_str(),
            edge.target.as_str(),
            edge.source_type.as_str(),
            edge.target_type.as_str(),
        ];
        xml.create_element("edge")
            .with_attributes([("source", edge.source.as_str()), ("target", edge.target.as_str())])
            .write_inner_content(|xml| write_data(xml, "e", &EDGE_COLUMNS, &values))?;
    }
    Ok(())
}

fn write_key<W: Write>(
    xml: &mut Writer<W>,
    prefix: &str,
    domain: &str,
    key: &str,
) -> quick_xml::Result<()> {
    let id = format!("{prefix}_{key}");
    xml.create_element("key")
        .with_attributes([
            ("id", id.as_str()),
            ("for", domain),
            ("attr.name", key),
            ("attr.type", "string"),
        ])
        .write_empty()?;
    Ok(())
}

fn write_data<W: Write>(
    xml: &mut Writer<W>,
    prefix: &str,
    keys: &[&str],
    values: &[&str],
) -> quick_xml::Result<()> {
    for (key, value) in keys.iter().zip(values) {
        let id = format!("{prefix}_{key}");
        xml.create_element("data")
            .with_attribute(("key", id.as_str()))
            .write_text_content(BytesText::new(value))?;
    }
    Ok(())
}

/// Write a Graphviz DOT description (no layout or styling).
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub fn write_dot<W: Write>(graph: &AsctGraph, mut w: W) -> io::Result<()> {
    writeln!(w, "strict digraph {{")?;
    for node in graph.nodes() {
        writeln!(
            w,
            "  \"{}\" [label=\"{}\", name=\"{}\", type=\"{}\", organ=\"{}\", ontology_id=\"{}\"];",
            dot_escape(&node.id),
            dot_escape(&node.name),
            dot_escape(&node.name),
            node.item_type,
            dot_escape(&node.organ),
            dot_escape(&node.ontology_id),
        )?;
    }
    for edge in graph.edges() {
        writeln!(
            w,
            "  \"{}\" -> \"{}\" [organ=\"{}\", source_type=\"{}\", target_type=\"{}\"];",
            dot_escape(&edge.source),
            dot_escape(&edge.target),
            dot_escape(&edge.organ),
            edge.source_type,
            edge.target_type,
        )?;
    }
    writeln!(w, "}}")
}

/// Write `graph` into `dir` in each of `formats`, creating `dir` if needed.
///
/// Returns the written paths in format order.
///
/// # Errors
///
/// Returns an error if the directory or any file cannot be written.
#[instrument(skip(graph, names), fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn export_graph(
    graph: &AsctGraph,
    dir: &Path,
    names: &ExportNames,
    formats: &[ExportFormat],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| AsctError::io(dir, source))?;

    let mut written = Vec::new();
    for format in formats {
        match format {
            ExportFormat::Csv => {
                let nodes = dir.join(names.nodes_csv);
                write_nodes_csv(graph, create(&nodes)?)?;
                written.push(nodes);

                let edges = dir.join(names.edges_csv);
                write_edges_csv(graph, create(&edges)?)?;
                written.push(edges);
            }
            ExportFormat::Graphml => {
                let path = dir.join(names.graphml);
                let mut out = create(&path)?;
                write_graphml(graph, &mut out)
                    .and_then(|()| out.flush())
                    .map_err(|source| AsctError::io(&path, source))?;
                written.push(path);
            }
            ExportFormat::Dot => {
                let path = dir.join(names.dot);
                let mut out = create(&path)?;
                write_dot(graph, &mut out)
                    .and_then(|()| out.flush())
                    .map_err(|source| AsctError::io(&path, source))?;
                written.push(path);
            }
        }
    }

    info!(files = written.len(), dir = %dir.display(), "exported graph");
    Ok(written)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| AsctError::io(path, source))
}

fn dot_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
