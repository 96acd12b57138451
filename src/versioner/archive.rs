//! Tarball backend for artifact repositories
//!
//! Each product is published as a gzipped tarball per branch. There is no
//! history: `pull` downloads the archive again and every branch or write
//! operation is refused.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info};

use super::{Versioner, unsupported};
use crate::config::{BackendCredentials, BackendSettings, expand_template};
use crate::error::{InstallerError, Result};
use crate::git::url::redact;

const BACKEND: &str = "archive";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ArchiveVersioner {
    url_template: String,
    default_branch: String,
    credentials: BackendCredentials,
    client: Client,
}

impl ArchiveVersioner {
    pub fn new(settings: &BackendSettings, credentials: BackendCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("workarea/{}", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| InstallerError::BackendUnavailable {
                backend: BACKEND.to_string(),
                reason: format!("cannot create HTTP client: {e}"),
            })?;

        Ok(Self {
            url_template: settings.url.clone(),
            default_branch: settings.branches.first().cloned().unwrap_or_default(),
            credentials,
            client,
        })
    }

    fn download_failed(url: &str, reason: String) -> InstallerError {
        InstallerError::DownloadFailed {
            url: redact(url).into_owned(),
            reason,
        }
    }

    fn describe(err: &reqwest::Error) -> String {
        if err.is_timeout() {
            "Request timeout".to_string()
        } else if err.is_connect() {
            format!("Connection failed: {err}")
        } else {
            err.to_string()
        }
    }

    /// Open the archive stream, from disk for `file://` URLs
    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        if let Some(path) = url.strip_prefix("file://") {
            let file = File::open(path).map_err(|e| {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    "404 Not Found".to_string()
                } else {
                    e.to_string()
                };
                Self::download_failed(url, reason)
            })?;
            return Ok(Box::new(file));
        }

        let mut request = self.client.get(url);
        if let Some(username) = self.credentials.username.as_deref() {
            request = request.basic_auth(username, self.credentials.password.as_deref());
        }
        let response = request
            .send()
            .map_err(|e| Self::download_failed(url, Self::describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::download_failed(url, status.to_string()));
        }
        Ok(Box::new(response))
    }

    /// Unpack a gzipped tarball into `target`.
    ///
    /// The archive is staged next to `target` first. When it holds a single
    /// top-level directory, that directory's content becomes the product tree.
    fn unpack(stream: Box<dyn Read>, target: &Path) -> Result<()> {
        let extract_failed = |reason: String| InstallerError::ExtractFailed {
            path: target.display().to_string(),
            reason,
        };

        let parent = target
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".workarea-unpack-")
            .tempdir_in(&parent)
            .map_err(|e| extract_failed(e.to_string()))?;

        tar::Archive::new(GzDecoder::new(stream))
            .unpack(staging.path())
            .map_err(|e| extract_failed(e.to_string()))?;

        let root = single_top_level_dir(staging.path())?.unwrap_or_else(|| staging.path().to_path_buf());

        if target.exists() {
            fs::remove_dir_all(target)?;
        }
        fs::create_dir_all(target)?;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            fs::rename(entry.path(), target.join(entry.file_name()))
                .map_err(|e| extract_failed(e.to_string()))?;
        }
        Ok(())
    }
}

fn single_top_level_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    match entries.as_slice() {
        [only] if only.file_type()?.is_dir() => Ok(Some(only.path())),
        _ => Ok(None),
    }
}

impl Versioner for ArchiveVersioner {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn supports_branches(&self) -> bool {
        false
    }

    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        debug!("Downloading {} into {}", redact(url), target.display());
        let stream = self.open(url)?;
        Self::unpack(stream, target)?;
        info!("Unpacked {} into {}", redact(url), target.display());
        Ok(())
    }

    fn checkout(&self, _repo: &Path, _branch: &str) -> Result<()> {
        Err(unsupported(BACKEND, "checkout"))
    }

    fn select_branch(&self, _repo: &Path, _candidates: &[String]) -> Result<Option<String>> {
        Err(unsupported(BACKEND, "select_branch"))
    }

    fn add(&self, _repo: &Path, _paths: &[&Path]) -> Result<()> {
        Err(unsupported(BACKEND, "add"))
    }

    fn commit(&self, _repo: &Path, _message: &str) -> Result<()> {
        Err(unsupported(BACKEND, "commit"))
    }

    fn push(&self, _repo: &Path, _branch: &str) -> Result<()> {
        Err(unsupported(BACKEND, "push"))
    }

    /// Download the archive again; the repository name is the directory name
    fn pull(&self, repo: &Path, branch: &str) -> Result<()> {
        let name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| InstallerError::InvalidRepositoryRef {
                message: format!("cannot derive a repository name from {}", repo.display()),
            })?;
        let branch = if branch.is_empty() {
            self.default_branch.as_str()
        } else {
            branch
        };
        let url = expand_template(&self.url_template, &name, branch);
        self.clone_repository(&url, repo)
    }

    fn stash(&self, _repo: &Path) -> Result<bool> {
        Err(unsupported(BACKEND, "stash"))
    }

    fn apply_stash(&self, _repo: &Path) -> Result<()> {
        Err(unsupported(BACKEND, "apply_stash"))
    }

    fn safe_pull(&self, _repo: &Path, _branch: &str) -> Result<()> {
        Err(unsupported(BACKEND, "safe_pull"))
    }

    fn check_remote_repository_exists(&self, url: &str) -> bool {
        if let Some(path) = url.strip_prefix("file://") {
            return Path::new(path).is_file();
        }

        let mut request = self.client.head(url);
        if let Some(username) = self.credentials.username.as_deref() {
            request = request.basic_auth(username, self.credentials.password.as_deref());
        }
        match request.send() {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Existence check of {} failed: {}", redact(url), Self::describe(&e));
                false
            }
        }
    }
}
