//! Input dataset model and providers.
//!
//! The release JSON is a mapping of organ-table name to a table object whose
//! `data` list holds rows. Each row lists its `anatomical_structures` and
//! `cell_types` as `{id, rdfs_label, name}` records. Fields the pipeline does
//! not use are ignored.
//!
//! Rows are kept as raw JSON so that the extractor can report a missing or
//! wrongly typed field together with the organ and row it came from.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{AsctError, Result};

/// One entry of a table's `data` list, unvalidated.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RawRow(pub Value);

impl RawRow {
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// The records under `key`, or `None` if absent, `null` or not a list.
    #[must_use]
    pub fn records(&self, key: &str) -> Option<&[Value]> {
        self.0.get(key)?.as_array().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OrganTable {
    pub data: Option<Vec<RawRow>>,
}

/// All organ tables, keyed by table name (e.g. `kidney`, `blood-vasculature`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    tables: BTreeMap<String, Vec<RawRow>>,
}

impl Dataset {
    /// Parse a release document from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`AsctError::DatasetParse`] if the document is not an object of
    /// tables or a table has no `data` list.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: BTreeMap<String, OrganTable> = serde_json::from_reader(reader)
            .map_err(|err| AsctError::DatasetParse(err.to_string()))?;
        Self::from_tables(raw)
    }

    /// Parse a release document from an in-memory JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::from_reader`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: BTreeMap<String, OrganTable> = serde_json::from_value(value)
            .map_err(|err| AsctError::DatasetParse(err.to_string()))?;
        Self::from_tables(raw)
    }

    fn from_tables(raw: BTreeMap<String, OrganTable>) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for (name, table) in raw {
            let Some(rows) = table.data else {
                return Err(AsctError::DatasetParse(format!(
                    "table `{name}` has no `data` list"
                )));
            };
            tables.insert(name, rows);
        }
        Ok(Self { tables })
    }

    /// Rows of one table, if present.
    #[must_use]
    pub fn rows(&self, table: &str) -> Option<&[RawRow]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Source of the organ tables.
pub trait DataProvider {
    /// Load the complete dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be obtained or parsed.
    fn load(&self) -> Result<Dataset>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Reads a release JSON from disk.
#[derive(Debug, Clone)]
pub struct FileProvider {
    pub path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataProvider for FileProvider {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Dataset> {
        let file = File::open(&self.path).map_err(|source| AsctError::io(&self.path, source))?;
        let dataset = Dataset::from_reader(BufReader::new(file))?;
        info!(
            tables = dataset.table_count(),
            rows = dataset.row_count(),
            "loaded dataset from file"
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Downloads a release JSON with a blocking GET.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    pub url: String,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl DataProvider for HttpProvider {
    #[instrument(skip(self), fields(url = %self.url))]
    fn load(&self) -> Result<Dataset> {
        let response = ureq::get(&self.url).call().map_err(|err| AsctError::Fetch {
            url: self.url.clone(),
            detail: err.to_string(),
        })?;
        let dataset = Dataset::from_reader(BufReader::new(response.into_reader()))?;
        info!(
            tables = dataset.table_count(),
            rows = dataset.row_count(),
            "downloaded dataset"
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tables_and_ignores_extra_keys() {
        let dataset = Dataset::from_value(json!({
            "kidney": {
                "csv": "ignored",
                "data": [{
                    "anatomical_structures": [{"id": "UBERON:0002113", "rdfs_label": "kidney", "name": "Kidney", "extra": 1}],
                    "cell_types": [],
                    "biomarkers": []
                }]
            },
            "heart": {"data": []}
        }))
        .expect("parse");

        assert_eq!(dataset.table_count(), 2);
        assert_eq!(dataset.row_count(), 1);
        assert_eq!(dataset.table_names().collect::<Vec<_>>(), vec!["heart", "kidney"]);
        let rows = dataset.rows("kidney").expect("kidney rows");
        let records = rows[0].records("anatomical_structures").expect("as");
        assert_eq!(records[0]["id"], "UBERON:0002113");
    }

    #[test]
    fn malformed_rows_still_parse() {
        let dataset = Dataset::from_value(json!({
            "lung": {"data": [null, {"anatomical_structures": [{"id": 5}], "cell_types": null}]}
        }))
        .expect("parse");
        let rows = dataset.rows("lung").expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_object());
        assert!(rows[1].records("cell_types").is_none());
        assert_eq!(rows[1].records("anatomical_structures").map(<[Value]>::len), Some(1));
    }

    #[test]
    fn table_without_data_is_rejected() {
        let err = Dataset::from_value(json!({"liver": {"rows": []}})).expect_err("no data");
        assert!(matches!(err, AsctError::DatasetParse(ref msg) if msg.contains("liver")));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let err = Dataset::from_value(json!([1, 2, 3])).expect_err("array");
        assert!(matches!(err, AsctError::DatasetParse(_)));
    }

    #[test]
    fn file_provider_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("asctb.json");
        std::fs::write(&path, r#"{"skin": {"data": []}}"#).expect("write");

        let dataset = FileProvider::new(&path).load().expect("load");
        assert!(dataset.contains_table("skin"));
    }

    #[test]
    fn file_provider_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FileProvider::new(dir.path().join("missing.json"))
            .load()
            .expect_err("missing");
        assert!(matches!(err, AsctError::Io { .. }));
    }
}
