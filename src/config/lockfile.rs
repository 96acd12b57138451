//! Lock manifest (products.lock.json)
//!
//! A snapshot of a resolved product collection, written after every
//! top-level fetch and read by later runs so they can skip re-resolution.
//! Each entry is the data-form serialization of a product plus where it was
//! fetched to and which backend and branch served it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InstallerError, Result};
use crate::product::descriptor::DataDescriptor;
use crate::product::{Product, ProductCollection};

pub const LOCK_FILE: &str = "products.lock.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockManifest {
    pub products: Vec<LockedProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedProduct {
    #[serde(flatten)]
    pub descriptor: DataDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirname: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_used: Option<String>,
}

impl From<&Product> for LockedProduct {
    fn from(product: &Product) -> Self {
        Self {
            descriptor: product.to_data(),
            branch: product.resolved_branch(),
            dirname: product.dirname.clone(),
            provider_name_used: product.provider_used.clone(),
            branch_used: product.branch_used.clone(),
        }
    }
}

impl LockedProduct {
    pub fn name(&self) -> &str {
        self.descriptor.name.as_deref().unwrap_or_default()
    }

    pub fn into_product(self) -> Result<Product> {
        let mut product = self.descriptor.into_product()?;
        product.branch = self.branch;
        product.dirname = self.dirname;
        product.provider_used = self.provider_name_used;
        product.branch_used = self.branch_used;
        Ok(product)
    }
}

impl LockManifest {
    pub fn from_collection(collection: &ProductCollection) -> Self {
        Self {
            products: collection.iter().map(LockedProduct::from).collect(),
        }
    }

    pub fn into_collection(self) -> Result<ProductCollection> {
        let products = self
            .products
            .into_iter()
            .map(LockedProduct::into_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(ProductCollection::from_products(products))
    }

    pub fn get(&self, name: &str) -> Option<&LockedProduct> {
        self.products.iter().find(|p| p.name() == name)
    }

    pub fn from_json(json: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| InstallerError::LockfileParseFailed {
            path: origin.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| InstallerError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?).map_err(|e| InstallerError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Wrote lock manifest with {} products to {}", self.products.len(), path.display());
        Ok(())
    }

    /// First existing lock manifest among `dirs`
    pub fn find(dirs: &[&Path]) -> Option<PathBuf> {
        dirs.iter()
            .map(|dir| dir.join(LOCK_FILE))
            .find(|path| path.is_file())
    }
}
