//! Cloning and fetching repositories
//!
//! Supports HTTPS, SSH and file:// URLs. Authentication goes through
//! [`setup_auth_callbacks`] with the backend's configured credentials.

use std::fs;
use std::path::Path;

use git2::{Direction, FetchOptions, RemoteCallbacks, Repository, build::RepoBuilder};
use tracing::debug;

use super::auth::setup_auth_callbacks;
use super::error::interpret_git_error;
use super::url::{normalize_for_libgit2, redact};
use crate::config::BackendCredentials;
use crate::error::{InstallerError, Result};

fn fetch_options(credentials: &BackendCredentials) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks, credentials);

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Clone `url` into `target`, replacing whatever is there.
pub fn clone(url: &str, target: &Path, credentials: &BackendCredentials) -> Result<Repository> {
    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| InstallerError::GitCloneFailed {
            url: redact(url).into_owned(),
            reason: format!("Failed to remove existing {}: {e}", target.display()),
        })?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Cloning {} into {}", redact(url), target.display());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(credentials));
    builder
        .clone(normalize_for_libgit2(url).as_ref(), target)
        .map_err(|e| InstallerError::GitCloneFailed {
            url: redact(url).into_owned(),
            reason: interpret_git_error(&e),
        })
}

/// Fetch every branch of `origin`
pub fn fetch_origin(repo: &Repository, credentials: &BackendCredentials) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    let refspecs = ["+refs/heads/*:refs/remotes/origin/*"];
    remote
        .fetch(&refspecs, Some(&mut fetch_options(credentials)), None)
        .map_err(|e| InstallerError::GitOperationFailed {
            message: format!("fetch failed: {}", interpret_git_error(&e)),
        })
}

/// Whether `url` answers as a git remote, checked without cloning
pub fn remote_exists(url: &str, credentials: &BackendCredentials) -> bool {
    let Ok(scratch) = crate::temp::scratch_dir("workarea-remote-") else {
        return false;
    };
    let Ok(repo) = Repository::init_bare(scratch.path()) else {
        return false;
    };
    let Ok(mut remote) = repo.remote_anonymous(normalize_for_libgit2(url).as_ref()) else {
        return false;
    };

    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks, credentials);
    match remote.connect_auth(Direction::Fetch, Some(callbacks), None) {
        Ok(connection) => connection.list().is_ok(),
        Err(e) => {
            debug!("Remote existence check for {} failed: {}", redact(url), interpret_git_error(&e));
            false
        }
    }
}
