//! Placement manifests
//!
//! A product describes how its files land in the workarea in the `[work]`
//! table of its `pyproject.toml`:
//!
//! ```toml
//! [work.init]
//! "var" = ["log", "conf/local.conf"]
//!
//! [work.copy]
//! "conf" = []
//!
//! [work.link]
//! "core/python" = ["*.py"]
//!
//! [work.link.external]
//! "vendor_pkg/data" = "core/data"
//!
//! [work.ignore]
//! "core/python" = ["__pycache__", "*.pyc"]
//! ```
//!
//! Entries keep their document order.

use std::fs;
use std::path::Path;

use crate::error::{InstallerError, Result};

pub const BUILD_CONFIG: &str = "pyproject.toml";

const WORK: &str = "work";
const EXTERNAL: &str = "external";

/// One `directory = [patterns]` line of a directive section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveEntry {
    pub directory: String,
    /// Empty means the whole directory as one unit
    pub patterns: Vec<String>,
}

/// One `link.external` mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLink {
    /// Relative to the third-party install root
    pub source: String,
    /// Relative to the workarea
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementManifest {
    pub init: Vec<DirectiveEntry>,
    pub copy: Vec<DirectiveEntry>,
    pub link: Vec<DirectiveEntry>,
    pub link_external: Vec<ExternalLink>,
    pub ignore: Vec<DirectiveEntry>,
}

impl PlacementManifest {
    /// Read the manifest of the product in `product_dir`.
    ///
    /// `Ok(None)` when there is no build configuration or it has no `[work]` table.
    pub fn load(product_dir: &Path) -> Result<Option<Self>> {
        let path = product_dir.join(BUILD_CONFIG);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| InstallerError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    pub fn from_toml(content: &str, origin: &str) -> Result<Option<Self>> {
        let parse_error = |reason: String| InstallerError::PlacementParseFailed {
            path: origin.to_string(),
            reason,
        };

        let document: toml::Table =
            toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        let Some(work) = document.get(WORK) else {
            return Ok(None);
        };
        let work = work
            .as_table()
            .ok_or_else(|| parse_error(format!("[{WORK}] must be a table")))?;

        let mut manifest = Self::default();
        for (section, value) in work {
            let table = value
                .as_table()
                .ok_or_else(|| parse_error(format!("[{WORK}.{section}] must be a table")))?;

            match section.as_str() {
                "init" => manifest.init = entries(table, section, &[]).map_err(parse_error)?,
                "copy" => manifest.copy = entries(table, section, &[]).map_err(parse_error)?,
                "ignore" => manifest.ignore = entries(table, section, &[]).map_err(parse_error)?,
                "link" => {
                    manifest.link = entries(table, section, &[EXTERNAL]).map_err(parse_error)?;
                    if let Some(external) = table.get(EXTERNAL) {
                        manifest.link_external = external_links(external).map_err(parse_error)?;
                    }
                }
                _ => {}
            }
        }

        Ok(Some(manifest))
    }

    pub fn is_empty(&self) -> bool {
        self.init.is_empty()
            && self.copy.is_empty()
            && self.link.is_empty()
            && self.link_external.is_empty()
    }
}

fn entries(
    table: &toml::Table,
    section: &str,
    skip: &[&str],
) -> std::result::Result<Vec<DirectiveEntry>, String> {
    table
        .iter()
        .filter(|(key, value)| !(skip.contains(&key.as_str()) && value.is_table()))
        .map(|(directory, value)| {
            let patterns = value
                .as_array()
                .ok_or_else(|| format!("{WORK}.{section}.\"{directory}\" must be a list"))?
                .iter()
                .map(|p| {
                    p.as_str().map(str::to_string).ok_or_else(|| {
                        format!("{WORK}.{section}.\"{directory}\" must contain only strings")
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DirectiveEntry {
                directory: directory.clone(),
                patterns,
            })
        })
        .collect()
}

fn external_links(value: &toml::Value) -> std::result::Result<Vec<ExternalLink>, String> {
    let table = value
        .as_table()
        .ok_or_else(|| format!("{WORK}.link.{EXTERNAL} must be a table"))?;

    table
        .iter()
        .map(|(source, destination)| {
            let destination = destination.as_str().ok_or_else(|| {
                format!("{WORK}.link.{EXTERNAL}.\"{source}\" must be a single path")
            })?;
            Ok(ExternalLink {
                source: source.clone(),
                destination: destination.to_string(),
            })
        })
        .collect()
}
