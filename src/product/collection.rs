//! Ordered product container

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::descriptor::{self, has_descriptor};
use super::{Product, ProductType};
use crate::error::Result;

/// Products in discovery order, looked up by name.
///
/// Pushing a product whose name is already present supersedes the earlier
/// record in place, so discovery order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCollection {
    products: Vec<Product>,
}

impl ProductCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut collection = Self::new();
        for product in products {
            collection.push(product);
        }
        collection
    }

    /// Load every product directory (one holding `description.xml`) directly under `dir`.
    ///
    /// Directories are visited in name order. Unreadable descriptors are
    /// logged and skipped.
    pub fn from_installer_dir(dir: &Path) -> Result<Self> {
        let mut collection = Self::new();
        if !dir.is_dir() {
            return Ok(collection);
        }

        let mut entries: Vec<_> = fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir() && has_descriptor(p))
            .collect();
        entries.sort();

        for path in entries {
            match descriptor::load_product(&path) {
                Ok(product) => collection.push(product),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} products from {}", collection.len(), dir.display());
        Ok(collection)
    }

    pub fn push(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.name() == product.name()) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.products.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    pub fn as_slice(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn filter_by_type(&self, product_type: ProductType) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.product_type == product_type)
            .collect()
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.categories.iter().any(|c| c == category))
            .collect()
    }

    /// Products ordered by type precedence, discovery order within a type
    pub fn sorted_by_precedence(&self) -> Vec<&Product> {
        let mut products: Vec<&Product> = self.products.iter().collect();
        products.sort_by_key(|p| p.product_type);
        products
    }

    /// Keep only the named products, in the order given
    pub fn select(&self, names: &[String]) -> Self {
        Self::from_products(names.iter().filter_map(|n| self.get(n)).cloned())
    }
}

impl<'a> IntoIterator for &'a ProductCollection {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}
