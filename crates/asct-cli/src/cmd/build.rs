//! `asct build`: load tables, build graphs, write exports, report diagnostics.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use asct_core::config::{BuildConfig, load_config};
use asct_core::dataset::{DataProvider, FileProvider, HttpProvider};
use asct_core::diagnostics::GraphDiagnostics;
use asct_core::export::{ExportFormat, ExportNames, export_graph};
use asct_core::pipeline::{self, BuildReport};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Export formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Graphml,
    Dot,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => Self::Csv,
            FormatArg::Graphml => Self::Graphml,
            FormatArg::Dot => Self::Dot,
        }
    }
}

/// Arguments for `asct build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Read the organ tables from a local JSON file.
    #[arg(long, conflicts_with = "url")]
    pub input: Option<PathBuf>,

    /// Download the organ tables from this URL (default: `source.url` from config).
    #[arg(long)]
    pub url: Option<String>,

    /// Config file (default: ./asct.toml if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the exports.
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,

    /// Build anatomical structure paths only.
    #[arg(long)]
    pub no_cell_types: bool,

    /// Give every organ table its own copy of shared entities.
    #[arg(long)]
    pub facet_by_table: bool,

    /// Also build the secondary overlay network.
    #[arg(long)]
    pub secondary: bool,

    /// Organ table feeding the secondary network (repeatable; replaces the configured list).
    #[arg(long = "secondary-organ", value_name = "TABLE")]
    pub secondary_organ: Vec<String>,

    /// Export format to write (repeatable; default: all).
    #[arg(long, value_enum)]
    pub format: Vec<FormatArg>,
}

impl BuildArgs {
    /// Layer command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut BuildConfig) {
        if self.no_cell_types {
            config.include_cell_types = false;
        }
        if self.facet_by_table {
            config.facet_by_table = true;
        }
        if self.secondary {
            config.secondary.enabled = true;
        }
        if !self.secondary_organ.is_empty() {
            config.secondary.organs.clone_from(&self.secondary_organ);
        }
        if let Some(url) = &self.url {
            config.source.url.clone_from(url);
        }
    }

    /// Requested formats in first-mention order, each once.
    fn formats(&self) -> Vec<ExportFormat> {
        if self.format.is_empty() {
            return ExportFormat::ALL.to_vec();
        }
        let mut formats = Vec::with_capacity(self.format.len());
        for format in self.format.iter().copied().map(ExportFormat::from) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        formats
    }

    fn provider(&self, config: &BuildConfig) -> Box<dyn DataProvider> {
        match &self.input {
            Some(path) => Box::new(FileProvider::new(path)),
            None => Box::new(HttpProvider::new(config.source.url.as_str())),
        }
    }
}

#[derive(Debug, Serialize)]
struct BuildOutput {
    source: String,
    out_dir: String,
    files: Vec<String>,
    report: BuildReport,
}

/// Execute `asct build`.
pub fn run_build(
    args: &BuildArgs,
    output: OutputMode,
    quiet: bool,
    cwd: &Path,
) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref(), cwd)?;
    args.apply(&mut config);

    let provider = args.provider(&config);
    let source = provider.describe();
    info!(source = %source, "loading dataset");
    let dataset = provider.load()?;

    let result = pipeline::run(&dataset, &config)?;

    let formats = args.formats();
    let mut files = export_graph(
        &result.primary.graph,
        &args.out_dir,
        &ExportNames::PRIMARY,
        &formats,
    )?;
    if let Some(network) = &result.secondary {
        files.extend(export_graph(
            &network.graph,
            &args.out_dir,
            &ExportNames::SECONDARY,
            &formats,
        )?);
    }

    if quiet && !output.is_json() {
        return Ok(());
    }

    let payload = BuildOutput {
        source,
        out_dir: args.out_dir.display().to_string(),
        files: files.iter().map(|path| path.display().to_string()).collect(),
        report: result.report,
    };
    render_mode(output, &payload, render_build_text, render_build_pretty)
}

fn diagnostics_lines(prefix: &str, diag: &GraphDiagnostics) -> Vec<(String, String)> {
    let mut lines = vec![
        (format!("{prefix}nodes"), diag.node_count.to_string()),
        (format!("{prefix}edges"), diag.edge_count.to_string()),
        (format!("{prefix}is_tree"), diag.is_tree.to_string()),
        (format!("{prefix}has_cycles"), diag.has_cycles.to_string()),
        (format!("{prefix}cycles"), diag.cycle_count.to_string()),
        (
            format!("{prefix}multi_parent_nodes"),
            diag.multi_parent_nodes.to_string(),
        ),
    ];
    if let Some(unreachable) = diag.unreachable_from_root {
        lines.push((format!("{prefix}unreachable"), unreachable.to_string()));
    }
    lines.push((format!("{prefix}content_hash"), diag.content_hash.clone()));
    lines
}

fn report_lines(payload: &BuildOutput) -> Vec<(String, String)> {
    let report = &payload.report;
    let build = &report.build;
    let mut lines = vec![
        ("source".to_string(), payload.source.clone()),
        ("tables".to_string(), report.tables.len().to_string()),
        ("rows".to_string(), report.rows.to_string()),
    ];
    lines.extend(diagnostics_lines("", &report.primary));
    lines.extend([
        ("paths".to_string(), build.paths.to_string()),
        ("empty_paths".to_string(), build.empty_paths.to_string()),
        ("duplicates".to_string(), build.duplicates.to_string()),
        ("merges".to_string(), build.merges.to_string()),
        (
            "self_loops_skipped".to_string(),
            build.self_loops_skipped.to_string(),
        ),
        (
            "existing_edges_skipped".to_string(),
            build.existing_edges_skipped.to_string(),
        ),
    ]);

    if let Some(secondary) = &report.secondary {
        lines.extend(diagnostics_lines("secondary.", &secondary.diagnostics));
        let counters = &secondary.counters;
        lines.extend([
            ("secondary.pairs".to_string(), counters.pairs.to_string()),
            (
                "secondary.unresolved_pairs".to_string(),
                counters.unresolved_pairs.to_string(),
            ),
            (
                "secondary.rejected_cell_type_edges".to_string(),
                counters.rejected_cell_type_edges.to_string(),
            ),
            (
                "secondary.shared_ontology_ids".to_string(),
                counters.shared_ontology_ids.to_string(),
            ),
        ]);
    }
    lines
}

fn render_build_text(payload: &BuildOutput, w: &mut dyn Write) -> io::Result<()> {
    for (key, value) in report_lines(payload) {
        writeln!(w, "{key}={value}")?;
    }
    for file in &payload.files {
        writeln!(w, "file={file}")?;
    }
    Ok(())
}

fn render_build_pretty(payload: &BuildOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Build")?;
    let lines = report_lines(payload);
    let (secondary, primary): (Vec<_>, Vec<_>) = lines
        .into_iter()
        .partition(|(key, _)| key.starts_with("secondary."));
    for (key, value) in &primary {
        pretty_kv(w, key, value)?;
    }
    if !secondary.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Secondary network")?;
        for (key, value) in &secondary {
            pretty_kv(w, key.trim_start_matches("secondary."), value)?;
        }
    }
    writeln!(w)?;
    pretty_section(w, &format!("Files ({})", payload.files.len()))?;
    for file in &payload.files {
        writeln!(w, "  {file}")?;
    }
    Ok(())
}
