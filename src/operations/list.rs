//! List operation
//!
//! Renders the products present in the installer directory, either as a
//! flat list with their dependencies or as one dependency tree per root.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::product::ProductCollection;
use crate::resolver::{DependencyGraph, render_tree};

/// Configuration options for list
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub tree: bool,
}

/// High-level list operation
pub struct ListOperation {
    installer_dir: PathBuf,
}

impl ListOperation {
    pub fn new(installer_dir: &Path) -> Self {
        Self {
            installer_dir: installer_dir.to_path_buf(),
        }
    }

    /// Render the installed products
    pub fn execute(&self, options: ListOptions) -> Result<String> {
        let collection = ProductCollection::from_installer_dir(&self.installer_dir)?;
        Ok(list_products(&collection, options.tree))
    }
}

pub fn list_products(collection: &ProductCollection, tree: bool) -> String {
    if collection.is_empty() {
        return "No products installed.".to_string();
    }
    if tree {
        return render_tree(&DependencyGraph::from_collection(collection));
    }

    let mut out = String::from("Installed products:\n==================");
    for product in collection.iter() {
        let _ = write!(out, "\n- {} ({})", product.name(), product.product_type);
        if !product.parents.is_empty() {
            let _ = write!(out, "\n  Dependencies: {}", product.parents.join(", "));
        }
    }
    out
}
