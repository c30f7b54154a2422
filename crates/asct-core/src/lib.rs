//! asct-core library.
//!
//! Builds a single body-rooted graph of anatomical structures and cell types
//! from ASCT+B organ tables, plus an optional overlay network for organs that
//! describe networks rather than hierarchies.
//!
//! # Conventions
//!
//! - **Errors**: Library functions return [`Result`] with [`AsctError`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod extract;
pub mod graph;
pub mod inspect;
pub mod item;
pub mod pipeline;
pub mod secondary;

pub use builder::{BuildCounters, BuiltGraph, GraphBuilder, Resolution};
pub use config::{BuildConfig, load_config};
pub use dataset::{DataProvider, Dataset, FileProvider, HttpProvider};
pub use diagnostics::GraphDiagnostics;
pub use error::{AsctError, ErrorCode, Result};
pub use export::{ExportFormat, ExportNames, export_graph};
pub use graph::{AsctGraph, EdgeAttrs, NodeAttrs};
pub use item::{Item, ItemType, Normalizer};
pub use pipeline::{BuildReport, PipelineOutput, SecondaryReport, run};
pub use secondary::{OntologyIndex, SecondaryBuilder, SecondaryNetwork};
