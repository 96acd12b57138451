//! Ignore rules of a placement manifest
//!
//! Each `[work.ignore]` entry scopes its patterns to one source directory
//! of the product. A file under that directory is ignored when a pattern
//! matches its path relative to the directory, its bare name, or any single
//! component of that relative path.

use std::path::{Path, PathBuf};

use wax::{CandidatePath, Glob, Pattern};

use crate::config::placement::DirectiveEntry;

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    scopes: Vec<(PathBuf, Vec<String>)>,
}

impl IgnoreRules {
    pub fn new(product_dir: &Path, entries: &[DirectiveEntry]) -> Self {
        let scopes = entries
            .iter()
            .filter(|entry| !entry.patterns.is_empty())
            .map(|entry| {
                let base = if entry.directory == "." {
                    product_dir.to_path_buf()
                } else {
                    product_dir.join(&entry.directory)
                };
                (base, entry.patterns.clone())
            })
            .collect();
        Self { scopes }
    }

    /// Whether `path`, somewhere inside the product directory, is ignored
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.scopes.iter().any(|(base, patterns)| {
            let Ok(relative) = path.strip_prefix(base) else {
                return false;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if relative.is_empty() {
                return false;
            }
            patterns.iter().any(|pattern| matches_relative(pattern, &relative))
        })
    }
}

fn matches_relative(pattern: &str, relative: &str) -> bool {
    if matches_glob(pattern, relative) {
        return true;
    }
    // The bare name is the last component
    relative.split('/').any(|part| matches_glob(pattern, part))
}

/// Match `candidate` against a glob, falling back to equality for invalid patterns
pub fn matches_glob(pattern: &str, candidate: &str) -> bool {
    match Glob::new(pattern) {
        Ok(glob) => glob.matched(&CandidatePath::from(candidate)).is_some(),
        Err(_) => pattern == candidate,
    }
}
