//! Dependency discovery
//!
//! Walks the parent closure of a product breadth-first. Every name met on
//! the walk is classified once as a [`ProductSource`]: either it can be read
//! from disk as is, or it must be fetched through the [`Selector`]. Fetching
//! a product reveals its descriptor and therefore its own parents, which
//! join the queue.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::lockfile::{LOCK_FILE, LockManifest};
use crate::error::{InstallerError, Result};
use crate::git;
use crate::product::descriptor::{has_descriptor, load_product};
use crate::product::{Product, ProductCollection, version_to_branch};
use crate::provider::{RepositoryRef, Selector, concise_cause};
use crate::ui::{FetchRecord, FetchStatus, ProgressReporter, SilentProgressReporter};

/// Where a product's record comes from
#[derive(Debug)]
pub enum ProductSource {
    /// Present in the installer directory with a readable descriptor
    Resolved(Product),
    /// Must be fetched from a backend
    NeedsFetch,
}

/// What to discover
#[derive(Debug, Clone)]
pub struct DiscoveryRequest<'r> {
    pub product: &'r str,
    pub version: &'r str,
    /// Explicit branch, applied to every product in the closure
    pub branch: Option<&'r str>,
    pub include_dependencies: bool,
}

pub struct Discovery<'a> {
    installer_dir: PathBuf,
    installer_product: String,
    selector: &'a mut Selector,
    progress: Box<dyn ProgressReporter>,
    previous: Option<LockManifest>,
    report: Vec<FetchRecord>,
}

impl<'a> Discovery<'a> {
    pub fn new(
        installer_dir: impl Into<PathBuf>,
        installer_product: impl Into<String>,
        selector: &'a mut Selector,
    ) -> Self {
        let installer_dir = installer_dir.into();
        let previous = LockManifest::find(&[installer_dir.as_path()])
            .and_then(|path| LockManifest::load(&path).ok());
        Self {
            installer_dir,
            installer_product: installer_product.into(),
            selector,
            progress: Box::new(SilentProgressReporter),
            previous,
            report: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn report(&self) -> &[FetchRecord] {
        &self.report
    }

    pub fn lock_path(&self) -> PathBuf {
        self.installer_dir.join(LOCK_FILE)
    }

    /// Resolve the closure of `request.product` and write the lock manifest.
    ///
    /// The requested product is always fetched. Dependencies already on
    /// disk are reused; one that cannot be fetched is reported and skipped.
    pub fn discover(&mut self, request: &DiscoveryRequest<'_>) -> Result<ProductCollection> {
        let result = self.walk(request);
        self.progress.finish();
        let collection = result?;

        LockManifest::from_collection(&collection).save(&self.lock_path())?;
        info!(
            "Resolved {} products for '{}'",
            collection.len(),
            request.product
        );
        Ok(collection)
    }

    fn walk(&mut self, request: &DiscoveryRequest<'_>) -> Result<ProductCollection> {
        let mut collection = ProductCollection::new();
        let mut seen: HashSet<String> = HashSet::from([request.product.to_string()]);
        let mut queue: VecDeque<(String, String)> = VecDeque::new();

        let root = self.fetch(request.product, request.version, request.branch)?;
        if request.include_dependencies {
            queue.extend(root.parents.iter().map(|p| (p.clone(), root.version.clone())));
        }
        collection.push(root);

        while let Some((name, inherited_version)) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if name == self.installer_product {
                debug!("Skipping the installer's own product '{}'", name);
                self.report.push(FetchRecord::new(
                    &name,
                    "-",
                    FetchStatus::Skipped,
                    "installer product",
                ));
                continue;
            }

            let mut product = match self.source_for(&name) {
                ProductSource::Resolved(product) => self.reuse(product, request.branch),
                ProductSource::NeedsFetch => {
                    match self.fetch(&name, &inherited_version, request.branch) {
                        Ok(product) => product,
                        Err(err) => {
                            warn!("Failed to fetch dependency '{}': {}", name, err);
                            continue;
                        }
                    }
                }
            };

            if product.version.is_empty() {
                product.version = inherited_version;
            }
            queue.extend(
                product
                    .parents
                    .iter()
                    .filter(|p| !seen.contains(*p))
                    .map(|p| (p.clone(), product.version.clone())),
            );
            collection.push(product);
        }

        Ok(collection)
    }

    /// Classify `name`: readable from the installer directory, or to be fetched
    pub fn source_for(&self, name: &str) -> ProductSource {
        let dir = self.installer_dir.join(name);
        if !has_descriptor(&dir) {
            return ProductSource::NeedsFetch;
        }
        match load_product(&dir) {
            Ok(product) => ProductSource::Resolved(product),
            Err(err) => {
                debug!("Existing '{}' is unreadable, fetching again: {}", name, err);
                ProductSource::NeedsFetch
            }
        }
    }

    fn reuse(&mut self, mut product: Product, branch: Option<&str>) -> Product {
        let locked = self
            .previous
            .as_ref()
            .and_then(|lock| lock.get(product.name()));

        product.provider_used = locked.and_then(|l| l.provider_name_used.clone());
        product.branch_used = product
            .dirname
            .as_deref()
            .and_then(git::current_branch)
            .or_else(|| locked.and_then(|l| l.branch_used.clone()));
        product.branch = branch.map(str::to_string);

        debug!("Reusing '{}' from the installer directory", product.name());
        self.report.push(FetchRecord::new(
            product.name(),
            product.provider_used.as_deref().unwrap_or("local"),
            FetchStatus::Cached,
            "",
        ));
        product
    }

    fn fetch(&mut self, name: &str, version: &str, branch: Option<&str>) -> Result<Product> {
        self.progress.start_product(name, self.report.len() + 1);

        let target = self.installer_dir.join(name);
        let requested = branch.map(str::to_string).or_else(|| version_to_branch(version));
        debug!(
            "Fetching '{}' into {} (branch {:?})",
            name,
            target.display(),
            requested
        );

        let fetched = self
            .selector
            .fetch(&target, requested.as_deref(), &RepositoryRef::Name(name.to_string()))
            .and_then(|outcome| load_fetched(&target, version, branch).map(|p| (outcome, p)));

        match fetched {
            Ok((outcome, mut product)) => {
                product.provider_used = Some(outcome.backend.clone());
                product.branch_used = Some(outcome.branch.clone());
                let cause = match requested.as_deref() {
                    Some(requested) if requested != outcome.branch => {
                        format!("fallback branch '{}'", outcome.branch)
                    }
                    _ => String::new(),
                };
                self.report.push(FetchRecord::new(
                    name,
                    outcome.backend,
                    FetchStatus::Fetched,
                    cause,
                ));
                Ok(product)
            }
            Err(err) => {
                let cause = match &err {
                    InstallerError::AllBackendsFailed { details, .. } => details
                        .lines()
                        .map(|line| line.trim_start_matches("• "))
                        .collect::<Vec<_>>()
                        .join("; "),
                    other => concise_cause(&other.to_string()),
                };
                self.report.push(FetchRecord::new(
                    name,
                    self.selector.providers().join(","),
                    FetchStatus::Failed,
                    cause,
                ));
                Err(err)
            }
        }
    }
}

fn load_fetched(target: &Path, version: &str, branch: Option<&str>) -> Result<Product> {
    let mut product = load_product(target)?;
    if product.version.is_empty() {
        product.version = version.to_string();
    }
    product.branch = branch.map(str::to_string);
    Ok(product)
}
