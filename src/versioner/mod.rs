//! Versioner backends
//!
//! A [`Versioner`] fetches a repository and manages its working copy. Three
//! drivers exist:
//!
//! - [`LibGitVersioner`]: git through libgit2
//! - [`GitCliVersioner`]: git through the `git` executable
//! - [`ArchiveVersioner`]: tarball downloads from an artifact repository,
//!   which has no branches or history. Branch and write operations fail
//!   with an "unsupported" error and `pull` downloads a fresh copy.

pub mod archive;
pub mod git_cli;
pub mod libgit;

use std::path::Path;

use tracing::warn;

use crate::config::{BackendCredentials, BackendKind, BackendSettings};
use crate::error::{InstallerError, Result};

pub use archive::ArchiveVersioner;
pub use git_cli::GitCliVersioner;
pub use libgit::LibGitVersioner;

pub trait Versioner {
    /// Driver name used in messages
    fn name(&self) -> &'static str;

    /// Whether `checkout` and `select_branch` are meaningful
    fn supports_branches(&self) -> bool {
        true
    }

    /// Fetch `url` into `target`, replacing any previous content
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()>;

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;

    /// First of `candidates` present locally or on the remote
    fn select_branch(&self, repo: &Path, candidates: &[String]) -> Result<Option<String>>;

    /// Stage `paths`, or every change when `paths` is empty
    fn add(&self, repo: &Path, paths: &[&Path]) -> Result<()>;

    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    fn push(&self, repo: &Path, branch: &str) -> Result<()>;

    fn pull(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Stash local modifications; `false` when there was nothing to stash
    fn stash(&self, repo: &Path) -> Result<bool>;

    fn apply_stash(&self, repo: &Path) -> Result<()>;

    /// Pull while keeping local modifications.
    ///
    /// Modifications are stashed before the pull and restored afterwards,
    /// also when the pull fails. A clean tree skips the stash entirely.
    fn safe_pull(&self, repo: &Path, branch: &str) -> Result<()> {
        let stashed = self.stash(repo)?;

        let pulled = self.pull(repo, branch);

        if stashed {
            if let Err(restore) = self.apply_stash(repo) {
                warn!(
                    "Could not restore stashed changes in {}: {}",
                    repo.display(),
                    restore
                );
                return pulled.and(Err(restore));
            }
        }

        pulled
    }

    fn check_remote_repository_exists(&self, url: &str) -> bool;
}

/// Build the driver for a backend
pub fn for_backend(
    settings: &BackendSettings,
    credentials: BackendCredentials,
) -> Result<Box<dyn Versioner>> {
    Ok(match settings.kind {
        BackendKind::Libgit2 => Box::new(LibGitVersioner::new(credentials)),
        BackendKind::GitCli => Box::new(GitCliVersioner::new(credentials)),
        BackendKind::Archive => Box::new(ArchiveVersioner::new(settings, credentials)?),
    })
}

pub(crate) fn unsupported(backend: &str, operation: &str) -> InstallerError {
    InstallerError::UnsupportedOperation {
        backend: backend.to_string(),
        operation: operation.to_string(),
    }
}
