//! Item normalization.
//!
//! Turns one `{id, rdfs_label, name}` record into an [`Item`] with a stable
//! identifier and display label. Records without an ontology id get a
//! synthetic identifier derived from their name, so two unidentified records
//! with the same name collapse onto one node.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static regex"));

static OUTSIDE_SLUG_ALPHABET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"));

/// Anatomical structure or cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "AS")]
    AnatomicalStructure,
    #[serde(rename = "CT")]
    CellType,
}

impl ItemType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnatomicalStructure => "AS",
            Self::CellType => "CT",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node candidate.
///
/// `ontology_id` is the real-world identity and never changes. `id` is the
/// working graph key; the builder may rebind or suffix it while resolving
/// collisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub organ: String,
    pub ontology_id: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        item_type: ItemType,
        organ: impl Into<String>,
        ontology_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type,
            organ: organ.into(),
            ontology_id: ontology_id.into(),
        }
    }

    /// The body root: working id and ontology id are both `id`.
    pub fn body(id: &str, name: &str) -> Self {
        Self::new(id, name, ItemType::AnatomicalStructure, "body", id)
    }
}

/// Validated string fields of one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSource<'a> {
    pub id: &'a str,
    pub rdfs_label: &'a str,
    pub name: &'a str,
}

/// Record-to-item conversion with the configured identifier policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    temp_namespace: String,
    facet_by_table: bool,
}

impl Normalizer {
    pub fn new(temp_namespace: impl Into<String>, facet_by_table: bool) -> Self {
        Self {
            temp_namespace: temp_namespace.into(),
            facet_by_table,
        }
    }

    /// Normalize one record seen in `organ` as `item_type`.
    #[must_use]
    pub fn item(&self, source: ItemSource<'_>, organ: &str, item_type: ItemType) -> Item {
        let ontology_id = if source.id.trim().is_empty() {
            temp_code(&self.temp_namespace, source.name)
        } else {
            source.id.to_string()
        };

        let name = display_label(source, &ontology_id);

        let id = if self.facet_by_table {
            format!("{ontology_id}_{organ}_{item_type}")
        } else {
            ontology_id.clone()
        };

        Item {
            id,
            name,
            item_type,
            organ: organ.to_string(),
            ontology_id,
        }
    }
}

/// Deterministic identifier for a record without an ontology id.
///
/// The name is trimmed and lowercased, each run of non-word characters
/// becomes one hyphen, anything outside `[a-z0-9-]` is dropped and edge
/// hyphens are trimmed. An empty slug yields the bare `"{namespace}:"`.
#[must_use]
pub fn temp_code(namespace: &str, name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let hyphenated = NON_WORD_RUN.replace_all(&lowered, "-");
    let slug = OUTSIDE_SLUG_ALPHABET.replace_all(&hyphenated, "");
    format!("{namespace}:{}", slug.trim_matches('-'))
}

fn display_label(source: ItemSource<'_>, ontology_id: &str) -> String {
    [source.rdfs_label, source.name]
        .into_iter()
        .map(str::trim)
        .find(|label| !label.is_empty())
        .unwrap_or(ontology_id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src<'a>(id: &'a str, rdfs_label: &'a str, name: &'a str) -> ItemSource<'a> {
        ItemSource {
            id,
            rdfs_label,
            name,
        }
    }

    #[test]
    fn raw_id_is_used_verbatim() {
        let normalizer = Normalizer::new("ASCTB-TEMP", false);
        let item = normalizer.item(
            src("UBERON:0002113", "kidney", "Kidney"),
            "kidney",
            ItemType::AnatomicalStructure,
        );
        assert_eq!(item.id, "UBERON:0002113");
        assert_eq!(item.ontology_id, "UBERON:0002113");
        assert_eq!(item.name, "kidney");
        assert_eq!(item.organ, "kidney");
    }

    #[test]
    fn missing_id_synthesizes_slug() {
        let normalizer = Normalizer::new("ASCTB-TEMP", false);
        let item = normalizer.item(src("  ", "", " Kidney "), "kidney", ItemType::AnatomicalStructure);
        assert_eq!(item.id, "ASCTB-TEMP:kidney");
        assert_eq!(item.ontology_id, "ASCTB-TEMP:kidney");
        assert_eq!(item.name, "Kidney");
    }

    #[test]
    fn slug_collapses_case_and_punctuation() {
        assert_eq!(
            temp_code("ASCTB-TEMP", "Left Kidney!"),
            temp_code("ASCTB-TEMP", "left   kidney")
        );
        assert_eq!(temp_code("ASCTB-TEMP", "left   kidney"), "ASCTB-TEMP:left-kidney");
    }

    #[test]
    fn slug_drops_non_ascii_and_underscores() {
        assert_eq!(temp_code("T", "Müller glia_cell"), "T:mller-gliacell");
        assert_eq!(temp_code("T", "CD4+ T cell (naïve)"), "T:cd4-t-cell-nave");
    }

    #[test]
    fn slug_of_punctuation_only_name_is_empty() {
        assert_eq!(temp_code("ASCTB-TEMP", "?!"), "ASCTB-TEMP:");
    }

    #[test]
    fn label_prefers_rdfs_label_then_name_then_id() {
        let normalizer = Normalizer::new("ASCTB-TEMP", false);
        let by_label = normalizer.item(src("CL:1", " podocyte ", "Podo"), "kidney", ItemType::CellType);
        assert_eq!(by_label.name, "podocyte");

        let by_name = normalizer.item(src("CL:1", "   ", "Podo"), "kidney", ItemType::CellType);
        assert_eq!(by_name.name, "Podo");

        let by_id = normalizer.item(src("CL:1", "", ""), "kidney", ItemType::CellType);
        assert_eq!(by_id.name, "CL:1");
    }

    #[test]
    fn facet_by_table_suffixes_working_id_only() {
        let normalizer = Normalizer::new("ASCTB-TEMP", true);
        let item = normalizer.item(src("CL:0000236", "B cell", "B cell"), "lymph_node", ItemType::CellType);
        assert_eq!(item.id, "CL:0000236_lymph_node_CT");
        assert_eq!(item.ontology_id, "CL:0000236");
    }

    #[test]
    fn item_type_codes() {
        assert_eq!(ItemType::AnatomicalStructure.as_str(), "AS");
        assert_eq!(ItemType::CellType.to_string(), "CT");
    }

    #[test]
    fn body_root_uses_id_for_both_keys() {
        let body = Item::body("UBERON:0013702", "body");
        assert_eq!(body.id, body.ontology_id);
        assert_eq!(body.organ, "body");
        assert_eq!(body.item_type, ItemType::AnatomicalStructure);
    }
}
