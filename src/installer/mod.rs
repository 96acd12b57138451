//! Workarea assembly
//!
//! This module handles:
//! - Resolving the product list, from the lock manifest when it is still valid
//! - Ordering products breadth-first from the requested one
//! - Applying each product's placement manifest with first-come-first-served claims

pub mod claims;
pub mod file_ops;
pub mod ignore;
pub mod placement;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::config::lockfile::{LockManifest, LockedProduct};
use crate::config::placement::PlacementManifest;
use crate::error::{InstallerError, Result};
use crate::product::descriptor::{MARKUP_DESCRIPTOR, load_product};
use crate::product::{Product, ProductCollection};
use crate::provider::Selector;
use crate::resolver::{DependencyGraph, Discovery, DiscoveryRequest};
use crate::ui::{FetchRecord, SilentProgressReporter};

use claims::ClaimSet;
use ignore::IgnoreRules;
use placement::{PlacementTarget, apply_all};

/// Outcome of one workarea installation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub products_processed: Vec<String>,
    /// Products without a placement section
    pub products_skipped: Vec<String>,
    pub placements: usize,
    pub conflicts: usize,
}

pub struct WorkareaInstaller<'a> {
    installer_dir: PathBuf,
    installer_product: String,
    third_party_dir: Option<PathBuf>,
    selector: &'a mut Selector,
    fetch_report: Vec<FetchRecord>,
}

impl<'a> WorkareaInstaller<'a> {
    pub fn new(settings: &Settings, selector: &'a mut Selector) -> Self {
        Self {
            installer_dir: settings.installer_dir.clone(),
            installer_product: settings.installer_product.clone(),
            third_party_dir: settings.third_party_dir.clone(),
            selector,
            fetch_report: Vec::new(),
        }
    }

    /// Products fetched while resolving, when the lock manifest could not be used
    pub fn fetch_report(&self) -> &[FetchRecord] {
        &self.fetch_report
    }

    /// Assemble `workarea` from `request.product` and, unless disabled, its dependencies
    pub fn install(
        &mut self,
        request: &DiscoveryRequest<'_>,
        workarea: &Path,
    ) -> Result<InstallSummary> {
        let collection = self.resolve_products(request, workarea)?;

        let products: Vec<&Product> = if request.include_dependencies {
            DependencyGraph::from_collection(&collection)
                .get_bfs_ordered_products(request.product, &collection)
        } else {
            collection.get(request.product).into_iter().collect()
        };
        if products.is_empty() {
            return Err(InstallerError::ProductNotFound {
                name: request.product.to_string(),
            });
        }

        file_ops::ensure_dir(workarea)?;
        let mut claims = ClaimSet::new(workarea);
        let mut summary = InstallSummary::default();

        for product in products {
            let product_dir = product
                .dirname
                .clone()
                .unwrap_or_else(|| self.installer_dir.join(product.name()));

            let manifest = match PlacementManifest::load(&product_dir) {
                Ok(Some(manifest)) if !manifest.is_empty() => manifest,
                Ok(_) => {
                    debug!("'{}' has no placement section", product.name());
                    summary.products_skipped.push(product.name().to_string());
                    continue;
                }
                Err(err) => {
                    warn!("Skipping '{}': {}", product.name(), err);
                    summary.products_skipped.push(product.name().to_string());
                    continue;
                }
            };

            let ignore = IgnoreRules::new(&product_dir, &manifest.ignore);
            let target = PlacementTarget {
                workarea,
                product_dir: &product_dir,
                third_party_dir: self.third_party_dir.as_deref(),
                ignore: &ignore,
            };
            let stats = apply_all(&manifest, &target, &mut claims)?;
            debug!(
                "'{}': {} placed, {} already claimed",
                product.name(),
                stats.placed,
                stats.conflicts
            );

            summary.placements += stats.placed;
            summary.conflicts += stats.conflicts;
            summary.products_processed.push(product.name().to_string());
        }

        info!(
            "Installed {} products into {}",
            summary.products_processed.len(),
            workarea.display()
        );
        Ok(summary)
    }

    /// The lock manifest when every entry still resolves, else a fresh
    /// fetch of the closure, else the requested product alone.
    fn resolve_products(
        &mut self,
        request: &DiscoveryRequest<'_>,
        workarea: &Path,
    ) -> Result<ProductCollection> {
        let mut search = vec![self.installer_dir.as_path(), workarea];
        if let Some(parent) = workarea.parent() {
            search.push(parent);
        }

        if let Some(path) = LockManifest::find(&search) {
            match LockManifest::load(&path).map(|lock| self.verify(lock)) {
                Ok(Some(collection)) if collection.contains(request.product) => {
                    debug!("Using lock manifest {}", path.display());
                    return Ok(collection);
                }
                Ok(_) => debug!("Lock manifest {} is stale", path.display()),
                Err(err) => warn!("Ignoring lock manifest {}: {}", path.display(), err),
            }
        }

        let mut discovery = Discovery::new(
            &self.installer_dir,
            &self.installer_product,
            &mut *self.selector,
        )
        .with_progress(Box::new(SilentProgressReporter));
        let fetched = discovery.discover(request);
        self.fetch_report = discovery.report().to_vec();

        match fetched {
            Ok(collection) => Ok(collection),
            Err(err) => {
                let dir = self.installer_dir.join(request.product);
                warn!(
                    "Could not resolve dependencies of '{}', installing it alone: {}",
                    request.product, err
                );
                load_product(&dir)
                    .map(|product| ProductCollection::from_products([product]))
                    .map_err(|_| err)
            }
        }
    }

    /// Check every locked directory, repairing entries whose product sits
    /// in the installer directory under its own name.
    fn verify(&self, lock: LockManifest) -> Option<ProductCollection> {
        let products = lock
            .products
            .into_iter()
            .map(|locked| self.verify_entry(locked))
            .collect::<Option<Vec<LockedProduct>>>()?;

        LockManifest { products }.into_collection().ok()
    }

    fn verify_entry(&self, mut locked: LockedProduct) -> Option<LockedProduct> {
        if locked.dirname.as_deref().is_some_and(Path::is_dir) {
            return Some(locked);
        }
        let fallback = self.installer_dir.join(locked.name());
        if fallback.join(MARKUP_DESCRIPTOR).is_file() {
            debug!(
                "Locked directory of '{}' moved, using {}",
                locked.name(),
                fallback.display()
            );
            locked.dirname = Some(fallback);
            return Some(locked);
        }
        debug!("Locked product '{}' is missing", locked.name());
        None
    }
}
