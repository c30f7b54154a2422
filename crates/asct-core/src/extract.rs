//! Path extraction.
//!
//! Each data row becomes two ordered item sequences: the anatomical
//! structure path (coarse to fine) and the cell type path. No deduplication
//! happens here; identity is resolved later by the builder, which is
//! order-sensitive, so [`ordered_tables`] fixes the table order up front.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{BuildConfig, OrganConfig};
use crate::dataset::{Dataset, RawRow};
use crate::error::{AsctError, Result};
use crate::item::{Item, ItemSource, ItemType, Normalizer};

/// The extracted paths of one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPaths {
    /// Source table name, e.g. `blood-vasculature`.
    pub table: String,
    /// 0-based index into the table's `data` list.
    pub row: usize,
    pub anatomical: Vec<Item>,
    pub cell_types: Vec<Item>,
}

impl RowPaths {
    /// The full traversal: anatomical structures, then (optionally) cell types.
    #[must_use]
    pub fn traversal(&self, include_cell_types: bool) -> Vec<Item> {
        let mut path = self.anatomical.clone();
        if include_cell_types {
            path.extend(self.cell_types.iter().cloned());
        }
        path
    }
}

/// Organ attribute for a table name (`blood-vasculature` -> `blood_vasculature`).
#[must_use]
pub fn organ_label(table: &str) -> String {
    table.replace('-', "_")
}

/// Fix the table processing order.
///
/// Precedence tables come first in configured order; tables missing from the
/// dataset are skipped with a warning. All other tables follow sorted by name,
/// minus the exclusion set.
#[must_use]
pub fn ordered_tables<'a>(dataset: &'a Dataset, organs: &'a OrganConfig) -> Vec<&'a str> {
    let excluded: HashSet<&str> = organs.exclude.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(dataset.table_count());

    for table in &organs.precedence {
        if !dataset.contains_table(table) {
            warn!(table = %table, "precedence table not present in dataset");
            continue;
        }
        if seen.insert(table.as_str()) {
            order.push(table.as_str());
        }
    }

    // Dataset table names iterate sorted.
    for table in dataset.table_names() {
        if excluded.contains(table) {
            debug!(table, "table excluded");
            continue;
        }
        if seen.insert(table) {
            order.push(table);
        }
    }

    order
}

/// Converts raw rows to [`RowPaths`] through a [`Normalizer`].
#[derive(Debug, Clone)]
pub struct PathExtractor {
    normalizer: Normalizer,
}

impl PathExtractor {
    #[must_use]
    pub const fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    #[must_use]
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(Normalizer::new(
            config.temp_namespace.clone(),
            config.facet_by_table,
        ))
    }

    /// Extract every row of `tables`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`AsctError::Extraction`] for the first row or record missing a
    /// field, and [`AsctError::DatasetParse`] if a table is not in `dataset`.
    #[instrument(skip(self, dataset, tables), fields(tables = tables.len()))]
    pub fn extract(&self, dataset: &Dataset, tables: &[&str]) -> Result<Vec<RowPaths>> {
        let mut paths = Vec::with_capacity(dataset.row_count());
        for table in tables {
            let rows = dataset.rows(table).ok_or_else(|| {
                AsctError::DatasetParse(format!("table `{table}` not found in dataset"))
            })?;
            for (index, row) in rows.iter().enumerate() {
                paths.push(self.extract_row(table, index, row)?);
            }
            debug!(table, rows = rows.len(), "extracted table");
        }
        info!(rows = paths.len(), "extracted row paths");
        Ok(paths)
    }

    /// Extract one row.
    ///
    /// # Errors
    ///
    /// Returns [`AsctError::Extraction`] naming the missing or malformed
    /// field, or `row` if the entry is not an object.
    pub fn extract_row(&self, table: &str, index: usize, row: &RawRow) -> Result<RowPaths> {
        if !row.is_object() {
            return Err(AsctError::Extraction {
                organ: table.to_string(),
                row: index,
                field: "row".to_string(),
            });
        }
        let organ = organ_label(table);
        let anatomical = self.items(
            table,
            index,
            &organ,
            "anatomical_structures",
            row.records("anatomical_structures"),
            ItemType::AnatomicalStructure,
        )?;
        let cell_types = self.items(
            table,
            index,
            &organ,
            "cell_types",
            row.records("cell_types"),
            ItemType::CellType,
        )?;

        Ok(RowPaths {
            table: table.to_string(),
            row: index,
            anatomical,
            cell_types,
        })
    }

    fn items(
        &self,
        table: &str,
        index: usize,
        organ: &str,
        list: &str,
        records: Option<&[Value]>,
        item_type: ItemType,
    ) -> Result<Vec<Item>> {
        let invalid = |field: String| AsctError::Extraction {
            organ: table.to_string(),
            row: index,
            field,
        };

        let records = records.ok_or_else(|| invalid(list.to_string()))?;
        records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                if !record.is_object() {
                    return Err(invalid(format!("{list}[{position}]")));
                }
                // Absent, null and non-string values are all rejected.
                let text = |name: &str| {
                    record
                        .get(name)
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid(format!("{list}[{position}].{name}")))
                };
                let source = ItemSource {
                    id: text("id")?,
                    rdfs_label: text("rdfs_label")?,
                    name: text("name")?,
                };
                Ok(self.normalizer.item(source, organ, item_type))
            })
            .collect()
    }
}
