//! Test fixtures shared by unit tests.
//!
//! [`fixture_selector`] builds a [`Selector`] over one in-memory backend
//! that "fetches" a product by writing its descriptor, so discovery,
//! installation and repair can be exercised without a network.
//!
//! ```ignore
//! let (mut selector, log) = fixture_selector(&[("kbot", &["kbot_core"]), ("kbot_core", &[])]);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::error::{InstallerError, Result};
use crate::product::descriptor::MARKUP_DESCRIPTOR;
use crate::provider::{Backend, BackendFactory, RepositoryRef, Selector};

/// `name@branch` for every clone attempt, in order
pub type FetchLog = Rc<RefCell<Vec<String>>>;

pub const FIXTURE_BACKEND: &str = "fixture";

/// Write a product directory holding a markup descriptor
pub fn write_product(dir: &Path, name: &str, parents: &[String]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let parents: String = parents
        .iter()
        .map(|p| format!("<parent name=\"{p}\"/>"))
        .collect();
    fs::write(
        dir.join(MARKUP_DESCRIPTOR),
        format!("<product name=\"{name}\"><parents>{parents}</parents></product>"),
    )
}

/// Writes a descriptor and any extra files for known names, fails with a
/// 404 otherwise
pub struct FixtureBackend {
    products: HashMap<String, Vec<String>>,
    files: Vec<(String, String, String)>,
    branches: Vec<String>,
    log: FetchLog,
}

impl Backend for FixtureBackend {
    fn name(&self) -> &str {
        FIXTURE_BACKEND
    }

    fn branches(&self) -> &[String] {
        &self.branches
    }

    fn clone_and_checkout(
        &self,
        target: &Path,
        branch: &str,
        repository: &RepositoryRef,
    ) -> Result<()> {
        let name = repository.display_name();
        self.log.borrow_mut().push(format!("{name}@{branch}"));
        let Some(parents) = self.products.get(name) else {
            return Err(InstallerError::GitCloneFailed {
                url: name.to_string(),
                reason: "Repository not found: 404 Not Found".to_string(),
            });
        };
        if target.exists() {
            fs::remove_dir_all(target)?;
        }
        write_product(target, name, parents)?;
        for (_, relative, content) in self.files.iter().filter(|(p, _, _)| p == name) {
            let path = target.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
        }
        Ok(())
    }

    fn check_remote_repository_exists(&self, repository: &RepositoryRef) -> bool {
        self.products.contains_key(repository.display_name())
    }
}

pub struct FixtureFactory {
    products: HashMap<String, Vec<String>>,
    files: Vec<(String, String, String)>,
    log: FetchLog,
}

impl BackendFactory for FixtureFactory {
    fn create(&self, _name: &str) -> Result<Box<dyn Backend>> {
        Ok(Box::new(FixtureBackend {
            products: self.products.clone(),
            files: self.files.clone(),
            branches: vec!["master".to_string(), "dev".to_string()],
            log: Rc::clone(&self.log),
        }))
    }
}

/// A selector over the fixture backend serving `products` as `(name, parents)`
pub fn fixture_selector(products: &[(&str, &[&str])]) -> (Selector, FetchLog) {
    fixture_selector_with_files(products, &[])
}

/// Like [`fixture_selector`], also writing `(product, relative path, content)` files
pub fn fixture_selector_with_files(
    products: &[(&str, &[&str])],
    files: &[(&str, &str, &str)],
) -> (Selector, FetchLog) {
    let log = FetchLog::default();
    let factory = FixtureFactory {
        products: products
            .iter()
            .map(|(name, parents)| {
                (
                    (*name).to_string(),
                    parents.iter().map(|p| (*p).to_string()).collect(),
                )
            })
            .collect(),
        files: files
            .iter()
            .map(|(p, r, c)| ((*p).to_string(), (*r).to_string(), (*c).to_string()))
            .collect(),
        log: Rc::clone(&log),
    };
    (
        Selector::new(vec![FIXTURE_BACKEND.to_string()], Box::new(factory)),
        log,
    )
}
