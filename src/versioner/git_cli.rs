//! Git backend driven through the `git` executable

use std::fs;
use std::path::Path;
use std::process::Output;

use tracing::debug;

use super::Versioner;
use crate::config::BackendCredentials;
use crate::error::{InstallerError, Result};
use crate::git::url::{redact, with_credentials};

pub struct GitCliVersioner {
    credentials: BackendCredentials,
}

impl GitCliVersioner {
    pub fn new(credentials: BackendCredentials) -> Self {
        Self { credentials }
    }

    /// Run git, capturing output. A non-zero exit status is returned as an
    /// error carrying stderr with any embedded credentials removed.
    fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output> {
        let mut expression = duct::cmd("git", args.iter().copied())
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        if let Some(dir) = dir {
            expression = expression.dir(dir);
        }

        let output = expression.run().map_err(|e| InstallerError::GitOperationFailed {
            message: format!("failed to run git: {e}"),
        })?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(InstallerError::GitOperationFailed {
                message: self.scrub(&format!(
                    "git {} failed: {}",
                    args.first().copied().unwrap_or_default(),
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
            })
        }
    }

    fn git_succeeds(&self, dir: &Path, args: &[&str]) -> bool {
        self.git(Some(dir), args).is_ok()
    }

    fn stdout(output: &Output) -> String {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn scrub(&self, text: &str) -> String {
        match self.credentials.password.as_deref() {
            Some(password) if !password.is_empty() => text.replace(password, "***"),
            _ => text.to_string(),
        }
    }

    fn origin_url(&self, repo: &Path) -> Result<String> {
        let output = self.git(Some(repo), &["remote", "get-url", "origin"])?;
        Ok(Self::stdout(&output))
    }

    fn available_branches(&self, repo: &Path) -> String {
        let Ok(output) = self.git(
            Some(repo),
            &[
                "for-each-ref",
                "--format=%(refname:short)",
                "refs/heads",
                "refs/remotes/origin",
            ],
        ) else {
            return String::new();
        };

        let mut names: Vec<String> = Self::stdout(&output)
            .lines()
            .map(|line| line.strip_prefix("origin/").unwrap_or(line).to_string())
            .filter(|name| name != "HEAD" && name != "origin")
            .collect();
        names.sort();
        names.dedup();
        names.join(", ")
    }
}

impl Versioner for GitCliVersioner {
    fn name(&self) -> &'static str {
        "git"
    }

    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        if target.exists() {
            fs::remove_dir_all(target).map_err(|e| InstallerError::GitCloneFailed {
                url: redact(url).into_owned(),
                reason: format!("Failed to remove existing {}: {e}", target.display()),
            })?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("git clone {} {}", redact(url), target.display());
        let authenticated = with_credentials(url, &self.credentials);
        let target_arg = target.to_string_lossy();
        self.git(None, &["clone", authenticated.as_ref(), target_arg.as_ref()])
            .map_err(|e| InstallerError::GitCloneFailed {
                url: redact(url).into_owned(),
                reason: e.to_string(),
            })?;

        // Keep secrets out of .git/config
        if authenticated.as_ref() != url {
            self.git(Some(target), &["remote", "set-url", "origin", url])?;
        }
        Ok(())
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        let remote_ref = format!("refs/remotes/origin/{branch}");
        let local_ref = format!("refs/heads/{branch}");
        let tracking = format!("origin/{branch}");

        let args: Vec<&str> =
            if self.git_succeeds(repo, &["rev-parse", "--verify", "--quiet", &remote_ref]) {
                if self.git_succeeds(repo, &["rev-parse", "--verify", "--quiet", &local_ref]) {
                    vec!["checkout", branch]
                } else {
                    vec!["checkout", "--track", "-b", branch, tracking.as_str()]
                }
            } else if self.git_succeeds(repo, &["rev-parse", "--verify", "--quiet", &local_ref]) {
                vec!["checkout", branch]
            } else {
                return Err(InstallerError::VersionNotFound {
                    version: branch.to_string(),
                    available: self.available_branches(repo),
                });
            };

        self.git(Some(repo), &args)
            .map(|_| ())
            .map_err(|e| InstallerError::GitCheckoutFailed {
                branch: branch.to_string(),
                reason: e.to_string(),
            })
    }

    fn select_branch(&self, repo: &Path, candidates: &[String]) -> Result<Option<String>> {
        Ok(candidates
            .iter()
            .find(|candidate| {
                self.git_succeeds(
                    repo,
                    &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{candidate}")],
                ) || self.git_succeeds(
                    repo,
                    &[
                        "rev-parse",
                        "--verify",
                        "--quiet",
                        &format!("refs/remotes/origin/{candidate}"),
                    ],
                )
            })
            .cloned())
    }

    fn add(&self, repo: &Path, paths: &[&Path]) -> Result<()> {
        let rendered: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        let mut args = vec!["add"];
        if rendered.is_empty() {
            args.push("--all");
        } else {
            args.push("--");
            args.extend(rendered.iter().map(String::as_str));
        }
        self.git(Some(repo), &args).map(|_| ())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.git(Some(repo), &["commit", "-m", message]).map(|_| ())
    }

    fn push(&self, repo: &Path, branch: &str) -> Result<()> {
        let origin = self.origin_url(repo)?;
        let authenticated = with_credentials(&origin, &self.credentials);
        self.git(Some(repo), &["push", authenticated.as_ref(), branch])
            .map(|_| ())
    }

    fn pull(&self, repo: &Path, branch: &str) -> Result<()> {
        let origin = self.origin_url(repo)?;
        let authenticated = with_credentials(&origin, &self.credentials);
        self.git(
            Some(repo),
            &["fetch", authenticated.as_ref(), "+refs/heads/*:refs/remotes/origin/*"],
        )?;
        self.git(
            Some(repo),
            &["merge", "--ff-only", &format!("refs/remotes/origin/{branch}")],
        )
        .map(|_| ())
    }

    fn stash(&self, repo: &Path) -> Result<bool> {
        let status = self.git(Some(repo), &["status", "--porcelain"])?;
        if Self::stdout(&status).is_empty() {
            return Ok(false);
        }
        self.git(
            Some(repo),
            &["stash", "push", "--include-untracked", "-m", "workarea: safe pull"],
        )?;
        Ok(true)
    }

    fn apply_stash(&self, repo: &Path) -> Result<()> {
        self.git(Some(repo), &["stash", "pop"]).map(|_| ())
    }

    fn check_remote_repository_exists(&self, url: &str) -> bool {
        let authenticated = with_credentials(url, &self.credentials);
        match self.git(None, &["ls-remote", "--heads", authenticated.as_ref()]) {
            Ok(_) => true,
            Err(e) => {
                debug!("Remote existence check for {} failed: {}", redact(url), e);
                false
            }
        }
    }
}
