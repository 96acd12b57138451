//! Repair operation
//!
//! Brings the installer directory back in line with the closure of one
//! product: products that are missing, empty or on the wrong branch are
//! fetched again, and products outside the closure are removed.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::config::lockfile::{LOCK_FILE, LockManifest};
use crate::error::Result;
use crate::git;
use crate::product::{ProductCollection, version_to_branch};
use crate::provider::{RepositoryRef, Selector};
use crate::resolver::{Discovery, DiscoveryRequest};
use crate::ui::FetchStatus;

pub const DEFAULT_VERSION: &str = "master";

/// Why a product is fetched again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairReason {
    Missing,
    Empty,
    WrongBranch,
}

/// High-level repair operation
pub struct RepairOperation<'a> {
    settings: &'a Settings,
    selector: Selector,
}

impl<'a> RepairOperation<'a> {
    pub fn new(settings: &'a Settings, selector: Selector) -> Self {
        Self { settings, selector }
    }

    /// Repair `product` at `version` (default `master`) and return the names fetched again.
    ///
    /// Products that were absent before this call count as repaired once
    /// discovery brings them back. The branch of each product is only
    /// checked when `version` is given.
    pub fn execute(&mut self, product: &str, version: Option<&str>) -> Result<Vec<String>> {
        let installer_dir = self.settings.installer_dir.clone();
        let existing: HashSet<String> = ProductCollection::from_installer_dir(&installer_dir)?
            .names()
            .into_iter()
            .collect();

        let target_version = version.unwrap_or(DEFAULT_VERSION);
        let request = DiscoveryRequest {
            product,
            version: target_version,
            branch: None,
            include_dependencies: true,
        };
        let (mut targets, fetched_now) = {
            let mut discovery = Discovery::new(
                &installer_dir,
                &self.settings.installer_product,
                &mut self.selector,
            );
            let targets = discovery.discover(&request)?;
            let fetched_now: HashSet<String> = discovery
                .report()
                .iter()
                .filter(|r| r.status == FetchStatus::Fetched)
                .map(|r| r.product.clone())
                .collect();
            (targets, fetched_now)
        };

        let expected_branch = version.and_then(version_to_branch);
        let mut repaired = Vec::new();
        for name in targets.names() {
            if name == self.settings.installer_product {
                continue;
            }
            let dir = installer_dir.join(&name);
            if fetched_now.contains(&name) {
                if !existing.contains(&name) {
                    info!("Restored missing '{}'", name);
                    repaired.push(name);
                }
                continue;
            }
            let branch_used = targets.get(&name).and_then(|p| p.branch_used.clone());
            let reason = needs_repair(
                &dir,
                expected_branch.as_deref(),
                branch_used.as_deref(),
            );
            let Some(reason) = reason else {
                continue;
            };

            info!("Repairing '{}' ({:?})", name, reason);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            let branch = version_to_branch(target_version);
            let outcome = self.selector.fetch(
                &dir,
                branch.as_deref(),
                &RepositoryRef::Name(name.clone()),
            )?;
            if let Some(product) = targets.get_mut(&name) {
                product.dirname = Some(dir);
                product.provider_used = Some(outcome.backend);
                product.branch_used = Some(outcome.branch);
            }
            repaired.push(name);
        }

        if !repaired.is_empty() {
            LockManifest::from_collection(&targets).save(&installer_dir.join(LOCK_FILE))?;
        }

        for name in &existing {
            if targets.contains(name) || *name == self.settings.installer_product {
                continue;
            }
            info!("Removing '{}', it is not part of '{}'", name, product);
            let dir = installer_dir.join(name);
            if let Err(err) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove {}: {}", dir.display(), err);
            }
        }

        Ok(repaired)
    }
}

/// `expected_branch` is `None` when the branch should not be checked
fn needs_repair(
    dir: &Path,
    expected_branch: Option<&str>,
    branch_used: Option<&str>,
) -> Option<RepairReason> {
    if !dir.is_dir() {
        return Some(RepairReason::Missing);
    }
    let empty = fs::read_dir(dir).map_or(true, |mut entries| entries.next().is_none());
    if empty {
        return Some(RepairReason::Empty);
    }

    let expected = expected_branch?;
    let current = git::current_branch(dir).or_else(|| branch_used.map(str::to_string));
    match current {
        Some(current) if current != expected => {
            debug!("{} is on '{}', expected '{}'", dir.display(), current, expected);
            Some(RepairReason::WrongBranch)
        }
        _ => None,
    }
}
