//! Git backend driven through libgit2

use std::path::Path;

use git2::{
    IndexAddOption, PushOptions, RemoteCallbacks, Repository, Signature, StashFlags, StatusOptions,
};
use tracing::{debug, info};

use super::Versioner;
use crate::config::BackendCredentials;
use crate::error::{InstallerError, Result};
use crate::git;

pub struct LibGitVersioner {
    credentials: BackendCredentials,
}

impl LibGitVersioner {
    pub fn new(credentials: BackendCredentials) -> Self {
        Self { credentials }
    }

    fn open(repo: &Path) -> Result<Repository> {
        Repository::open(repo).map_err(|e| InstallerError::GitOperationFailed {
            message: format!("cannot open repository at {}: {}", repo.display(), e.message()),
        })
    }

    fn signature(repo: &Repository) -> Result<Signature<'static>> {
        repo.signature()
            .or_else(|_| Signature::now("workarea", "workarea@localhost"))
            .map_err(InstallerError::from)
    }

    fn has_local_changes(repo: &Repository) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        Ok(!repo.statuses(Some(&mut options))?.is_empty())
    }
}

impl Versioner for LibGitVersioner {
    fn name(&self) -> &'static str {
        "libgit2"
    }

    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        git::clone(url, target, &self.credentials).map(|_| ())
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        git::checkout_branch(&Self::open(repo)?, branch)
    }

    fn select_branch(&self, repo: &Path, candidates: &[String]) -> Result<Option<String>> {
        let repo = Self::open(repo)?;
        Ok(candidates
            .iter()
            .find(|candidate| git::branch_exists(&repo, candidate))
            .cloned())
    }

    fn add(&self, repo: &Path, paths: &[&Path]) -> Result<()> {
        let repo = Self::open(repo)?;
        let mut index = repo.index()?;
        if paths.is_empty() {
            index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        } else {
            for path in paths {
                index.add_path(path)?;
            }
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        let repo = Self::open(repo)?;
        let signature = Self::signature(&repo)?;
        let tree_id = repo.index()?.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!("Created commit {}", oid);
        Ok(())
    }

    fn push(&self, repo: &Path, branch: &str) -> Result<()> {
        let repo = Self::open(repo)?;
        let mut remote = repo.find_remote("origin")?;

        let mut callbacks = RemoteCallbacks::new();
        git::auth::setup_auth_callbacks(&mut callbacks, &self.credentials);
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|e| InstallerError::GitOperationFailed {
                message: format!("push failed: {}", git::error::interpret_git_error(&e)),
            })
    }

    fn pull(&self, repo_path: &Path, branch: &str) -> Result<()> {
        let repo = Self::open(repo_path)?;
        git::fetch_origin(&repo, &self.credentials)?;

        let remote_ref = repo
            .find_reference(&format!("refs/remotes/origin/{branch}"))
            .map_err(|_| InstallerError::VersionNotFound {
                version: branch.to_string(),
                available: git::list_branches(&repo).join(", "),
            })?;
        let incoming = repo.reference_to_annotated_commit(&remote_ref)?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            debug!("{} is up to date", repo_path.display());
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(InstallerError::GitOperationFailed {
                message: format!("cannot fast-forward '{branch}' in {}", repo_path.display()),
            });
        }

        let local_name = format!("refs/heads/{branch}");
        match repo.find_reference(&local_name) {
            Ok(mut local) => {
                local.set_target(incoming.id(), "workarea: fast-forward")?;
            }
            Err(_) => {
                repo.reference(&local_name, incoming.id(), true, "workarea: fast-forward")?;
            }
        }
        repo.set_head(&local_name)?;
        repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))?;
        info!("Fast-forwarded {} to {}", repo_path.display(), incoming.id());
        Ok(())
    }

    fn stash(&self, repo: &Path) -> Result<bool> {
        let mut repo = Self::open(repo)?;
        if !Self::has_local_changes(&repo)? {
            return Ok(false);
        }
        let signature = Self::signature(&repo)?;
        repo.stash_save(
            &signature,
            "workarea: safe pull",
            Some(StashFlags::INCLUDE_UNTRACKED),
        )?;
        Ok(true)
    }

    fn apply_stash(&self, repo: &Path) -> Result<()> {
        let mut repo = Self::open(repo)?;
        repo.stash_pop(0, None)?;
        Ok(())
    }

    fn check_remote_repository_exists(&self, url: &str) -> bool {
        git::remote_exists(url, &self.credentials)
    }
}
