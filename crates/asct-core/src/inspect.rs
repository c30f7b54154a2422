//! Read-side queries over an exported node table.
//!
//! Used to sanity-check a build: how many rows repeat, where an entity
//! landed, and which of an organ's entities were placed more than once.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::instrument;

use crate::error::{AsctError, Result};
use crate::graph::NodeAttrs;

/// A node lookup. At most one criterion may be given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeQuery {
    Name(String),
    OntologyId(String),
}

impl NodeQuery {
    /// Build a query from optional command-line criteria.
    ///
    /// # Errors
    ///
    /// Returns [`AsctError::InvalidConfiguration`] if both are given.
    pub fn from_options(name: Option<String>, ontology_id: Option<String>) -> Result<Option<Self>> {
        match (name, ontology_id) {
            (Some(_), Some(_)) => Err(AsctError::InvalidConfiguration(
                "use either --name or --ontology-id, not both".to_string(),
            )),
            (Some(name), None) => Ok(Some(Self::Name(name))),
            (None, Some(ontology_id)) => Ok(Some(Self::OntologyId(ontology_id))),
            (None, None) => Ok(None),
        }
    }

    fn matches(&self, node: &NodeAttrs) -> bool {
        match self {
            Self::Name(name) => node.name == *name,
            Self::OntologyId(ontology_id) => node.ontology_id == *ontology_id,
        }
    }
}

/// Node rows, in file order.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    rows: Vec<NodeAttrs>,
}

impl NodeTable {
    /// Parse a node table with the export header.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed row.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let rows = csv
            .deserialize::<NodeAttrs>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| AsctError::io(path, source))?;
        Self::read(BufReader::new(file))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows repeating an earlier row's `(id, type, organ, ontology_id)`.
    ///
    /// Zero for any table written by the builder.
    #[must_use]
    pub fn duplicate_rows(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows
            .iter()
            .filter(|row| {
                !seen.insert((
                    row.id.as_str(),
                    row.item_type,
                    row.organ.as_str(),
                    row.ontology_id.as_str(),
                ))
            })
            .count()
    }

    /// Rows matching `query`, in file order.
    #[must_use]
    pub fn find(&self, query: &NodeQuery) -> Vec<&NodeAttrs> {
        self.rows.iter().filter(|row| query.matches(row)).collect()
    }

    /// Rows of `organ` whose ontology id occurs on more than one row
    /// anywhere in the table, in file order, at most `limit` of them.
    #[must_use]
    pub fn shared_in_organ(&self, organ: &str, limit: usize) -> Vec<&NodeAttrs> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            *counts.entry(row.ontology_id.as_str()).or_default() += 1;
        }
        self.rows
            .iter()
            .filter(|row| row.organ == organ)
            .filter(|row| counts.get(row.ontology_id.as_str()).is_some_and(|&n| n > 1))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
id,name,type,organ,ontology_id
UBERON:0013702,body,AS,body,UBERON:0013702
UBERON:0002113,kidney,AS,kidney,UBERON:0002113
CL:1,podocyte,CT,kidney,CL:1
CL:1$$1,podocyte,CT,kidney,CL:1
CL:1$$2,podocyte,CT,kidney,CL:1
CL:2,endothelial,CT,kidney,CL:2
CL:2$$3,endothelial,CT,kidney,CL:2
CL:2$$4,endothelial,CT,heart,CL:2
CL:1,podocyte,CT,kidney,CL:1
";

    fn table() -> NodeTable {
        NodeTable::read(TABLE.as_bytes()).expect("parse")
    }

    #[test]
    fn query_rejects_both_criteria() {
        let err = NodeQuery::from_options(Some("a".into()), Some("b".into()))
            .expect_err("conflict");
        assert!(matches!(err, AsctError::InvalidConfiguration(_)));
        assert_eq!(
            NodeQuery::from_options(None, Some("CL:1".into())).expect("ok"),
            Some(NodeQuery::OntologyId("CL:1".into()))
        );
        assert_eq!(NodeQuery::from_options(None, None).expect("ok"), None);
    }

    #[test]
    fn counts_repeated_rows() {
        let table = table();
        assert_eq!(table.len(), 9);
        assert_eq!(table.duplicate_rows(), 1);
    }

    #[test]
    fn find_by_name_and_ontology_id() {
        let table = table();
        assert_eq!(table.find(&NodeQuery::Name("podocyte".into())).len(), 4);
        let hits = table.find(&NodeQuery::OntologyId("CL:2".into()));
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["CL:2", "CL:2$$3", "CL:2$$4"]);
    }

    #[test]
    fn shared_in_organ_uses_table_wide_counts() {
        let table = table();
        let ids = |rows: Vec<&NodeAttrs>| -> Vec<String> {
            rows.into_iter().map(|n| n.id.clone()).collect()
        };
        // CL:2$$4 is the only heart row but shares CL:2 with kidney rows.
        assert_eq!(ids(table.shared_in_organ("heart", 10)), vec!["CL:2$$4"]);
        assert_eq!(
            ids(table.shared_in_organ("kidney", 3)),
            vec!["CL:1", "CL:1$$1", "CL:1$$2"]
        );
        assert_eq!(table.shared_in_organ("kidney", 10).len(), 6);
        assert!(table.shared_in_organ("body", 10).is_empty());
    }

    #[test]
    fn malformed_type_is_a_table_error() {
        let bad = "id,name,type,organ,ontology_id\nA,a,XX,kidney,A\n";
        let err = NodeTable::read(bad.as_bytes()).expect_err("bad type");
        assert!(matches!(err, AsctError::Csv(_)));
    }
}
