//! Build configuration.
//!
//! Every field has a default, so an absent or partial `asct.toml` is valid.
//! Callers layer CLI overrides on top of [`load_config`] and then call
//! [`BuildConfig::validate`] before running the pipeline.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AsctError, Result};

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "asct.toml";

/// Public all-organs ASCT+B release.
pub const DEFAULT_SOURCE_URL: &str =
    "https://cdn.humanatlas.io/hra-asctb-json-releases/hra-asctb-all.v2.1.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Append each row's cell type path to its anatomical structure path.
    #[serde(default = "default_true")]
    pub include_cell_types: bool,
    /// Make node ids unique per organ table and item type.
    #[serde(default)]
    pub facet_by_table: bool,
    /// Prefix for identifiers synthesized from names.
    #[serde(default = "default_temp_namespace")]
    pub temp_namespace: String,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub organs: OrganConfig,
    #[serde(default)]
    pub secondary: SecondaryConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            include_cell_types: default_true(),
            facet_by_table: false,
            temp_namespace: default_temp_namespace(),
            body: BodyConfig::default(),
            organs: OrganConfig::default(),
            secondary: SecondaryConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// The single root every organ hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyConfig {
    #[serde(default = "default_body_id")]
    pub id: String,
    #[serde(default = "default_body_name")]
    pub name: String,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            id: default_body_id(),
            name: default_body_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganConfig {
    /// Tables processed first, in this order.
    #[serde(default = "default_precedence")]
    pub precedence: Vec<String>,
    /// Tables never processed (e.g. content duplicated in another table).
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for OrganConfig {
    fn default() -> Self {
        Self {
            precedence: default_precedence(),
            exclude: default_exclude(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecondaryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Organ tables whose paths form the overlay network.
    #[serde(default = "default_secondary_organs")]
    pub organs: Vec<String>,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            organs: default_secondary_organs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
        }
    }
}

impl BuildConfig {
    /// Reject contradictory settings before any data is touched.
    ///
    /// # Errors
    ///
    /// Returns [`AsctError::InvalidConfiguration`] describing the first
    /// conflict found.
    pub fn validate(&self) -> Result<()> {
        if self.temp_namespace.trim().is_empty() {
            return Err(AsctError::InvalidConfiguration(
                "temp_namespace must not be empty".to_string(),
            ));
        }
        if self.body.id.trim().is_empty() {
            return Err(AsctError::InvalidConfiguration(
                "body.id must not be empty".to_string(),
            ));
        }

        let excluded: HashSet<&str> = self.organs.exclude.iter().map(String::as_str).collect();
        if let Some(organ) = self
            .organs
            .precedence
            .iter()
            .find(|organ| excluded.contains(organ.as_str()))
        {
            return Err(AsctError::InvalidConfiguration(format!(
                "organ `{organ}` is listed in both organs.precedence and organs.exclude"
            )));
        }

        if self.secondary.enabled {
            if self.secondary.organs.is_empty() {
                return Err(AsctError::InvalidConfiguration(
                    "secondary network is enabled but secondary.organs is empty".to_string(),
                ));
            }
            if let Some(organ) = self
                .secondary
                .organs
                .iter()
                .find(|organ| excluded.contains(organ.as_str()))
            {
                return Err(AsctError::InvalidConfiguration(format!(
                    "secondary organ `{organ}` is excluded by organs.exclude"
                )));
            }
        }

        Ok(())
    }
}

/// Load a config file, or defaults when `path` is `None` and no
/// [`DEFAULT_CONFIG_FILE`] exists in `cwd`.
///
/// An explicitly given path that does not exist is an error.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>, cwd: &Path) -> Result<BuildConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            if !candidate.exists() {
                return Ok(BuildConfig::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| AsctError::io(&path, source))?;
    toml::from_str::<BuildConfig>(&content).map_err(|source| AsctError::ConfigParse { path, source })
}

const fn default_true() -> bool {
    true
}

fn default_temp_namespace() -> String {
    "ASCTB-TEMP".to_string()
}

fn default_body_id() -> String {
    "UBERON:0013702".to_string()
}

fn default_body_name() -> String {
    "body".to_string()
}

fn default_precedence() -> Vec<String> {
    [
        "anatomical-systems",
        "blood-vasculature",
        "lymph-vasculature",
        "peripheral-nervous-system",
        "muscular-system",
        "skeleton",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exclude() -> Vec<String> {
    vec!["bonemarrow-pelvis".to_string()]
}

fn default_secondary_organs() -> Vec<String> {
    vec!["blood-vasculature".to_string()]
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}
