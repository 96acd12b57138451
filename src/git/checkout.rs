//! Branch checkout for cloned repositories

use std::path::Path;

use git2::{BranchType, Repository, build::CheckoutBuilder};

use crate::error::{InstallerError, Result};

const ORIGIN_PREFIX: &str = "origin/";

fn checkout_failed(branch: &str, err: &git2::Error) -> InstallerError {
    InstallerError::GitCheckoutFailed {
        branch: branch.to_string(),
        reason: err.message().to_string(),
    }
}

/// Check out `branch`, preferring the remote-tracking ref.
///
/// When `origin/<branch>` exists, the local branch is created from it if
/// missing. Otherwise an existing local branch is used. Failing both, the
/// error lists the branches that do exist.
pub fn checkout_branch(repo: &Repository, branch: &str) -> Result<()> {
    let remote = repo.find_branch(&format!("{ORIGIN_PREFIX}{branch}"), BranchType::Remote);

    if let Ok(remote) = remote {
        if repo.find_branch(branch, BranchType::Local).is_err() {
            let commit = remote
                .get()
                .peel_to_commit()
                .map_err(|e| checkout_failed(branch, &e))?;
            let mut local = repo
                .branch(branch, &commit, false)
                .map_err(|e| checkout_failed(branch, &e))?;
            local
                .set_upstream(Some(&format!("{ORIGIN_PREFIX}{branch}")))
                .map_err(|e| checkout_failed(branch, &e))?;
        }
    } else if repo.find_branch(branch, BranchType::Local).is_err() {
        return Err(InstallerError::VersionNotFound {
            version: branch.to_string(),
            available: list_branches(repo).join(", "),
        });
    }

    repo.set_head(&format!("refs/heads/{branch}"))
        .map_err(|e| checkout_failed(branch, &e))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .map_err(|e| checkout_failed(branch, &e))
}

/// Local and remote branch names, without the `origin/` prefix, sorted
pub fn list_branches(repo: &Repository) -> Vec<String> {
    let mut names: Vec<String> = repo
        .branches(None)
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .filter_map(|(branch, _)| branch.name().ok().flatten().map(str::to_string))
        .map(|name| name.strip_prefix(ORIGIN_PREFIX).map_or(name.clone(), str::to_string))
        .filter(|name| name != "HEAD")
        .collect();
    names.sort();
    names.dedup();
    names
}

pub fn branch_exists(repo: &Repository, branch: &str) -> bool {
    repo.find_branch(branch, BranchType::Local).is_ok()
        || repo
            .find_branch(&format!("{ORIGIN_PREFIX}{branch}"), BranchType::Remote)
            .is_ok()
}

/// Branch HEAD points at, `None` when detached or not a repository
pub fn current_branch(path: &Path) -> Option<String> {
    let repo = Repository::open(path).ok()?;
    let head = repo.head().ok()?;
    if head.is_branch() {
        head.shorthand().map(str::to_string)
    } else {
        None
    }
}
