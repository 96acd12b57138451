//! Common test utilities for workarea integration tests
//!
//! [`TestEnv`] lays out origin repositories, an installer directory and a
//! configuration whose single `local` backend clones `file://` origins.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use git2::{IndexAddOption, Repository, Signature};
use tempfile::TempDir;

pub struct TestEnv {
    pub temp: TempDir,
    pub origins: PathBuf,
    pub installer_dir: PathBuf,
    pub config: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let origins = temp.path().join("origins");
        let installer_dir = temp.path().join("installer");
        fs::create_dir_all(&origins).expect("Failed to create origins directory");
        fs::create_dir_all(&installer_dir).expect("Failed to create installer directory");

        let config = temp.path().join("config.yaml");
        fs::write(
            &config,
            format!(
                "providers: [local]\n\
                 backends:\n  \
                   local:\n    \
                     kind: libgit2\n    \
                     url: \"file://{}/{{name}}\"\n    \
                     branches: [master, dev]\n",
                origins.display()
            ),
        )
        .expect("Failed to write config");

        Self {
            temp,
            origins,
            installer_dir,
            config,
        }
    }

    /// `workarea` with this environment's config and installer directory
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("workarea").expect("binary builds");
        cmd.env_remove("WORKAREA_INSTALLER_DIR");
        cmd.env_remove("WORKAREA_CONFIG");
        cmd.env_remove("WORKAREA_LOG");
        cmd.env_remove("WORKAREA_THIRD_PARTY_DIR");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.arg("--config").arg(&self.config);
        cmd.arg("--installer-dir").arg(&self.installer_dir);
        cmd
    }

    pub fn workarea(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    /// Create an origin repository for `name` with `master` and `dev` branches.
    ///
    /// `files` are `(relative path, content)` pairs committed next to the
    /// descriptor; a `pyproject.toml` among them carries the placement manifest.
    pub fn origin(&self, name: &str, parents: &[&str], files: &[(&str, &str)]) -> PathBuf {
        let path = self.origins.join(name);
        fs::create_dir_all(&path).expect("Failed to create origin");
        write_file(&path, "description.xml", &descriptor(name, parents));
        for (relative, content) in files {
            write_file(&path, relative, content);
        }
        commit_all(&path, &["master", "dev"]);
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn descriptor(name: &str, parents: &[&str]) -> String {
    let parents: String = parents
        .iter()
        .map(|p| format!("<parent name=\"{p}\"/>"))
        .collect();
    format!("<product name=\"{name}\" type=\"solution\"><parents>{parents}</parents></product>")
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
}

/// Commit the whole tree once and point every branch in `branches` at it
fn commit_all(path: &Path, branches: &[&str]) {
    let repo = Repository::init(path).expect("Failed to init origin");
    let mut index = repo.index().expect("index");
    index
        .add_all(["*"], IndexAddOption::DEFAULT, None)
        .expect("Failed to stage files");
    index.write().expect("Failed to write index");
    let tree_id = index.write_tree().expect("Failed to write tree");
    let tree = repo.find_tree(tree_id).expect("tree");
    let signature = Signature::now("Test", "test@example.com").expect("signature");
    let oid = repo
        .commit(None, &signature, &signature, "init", &tree, &[])
        .expect("Failed to commit");
    for branch in branches {
        repo.reference(&format!("refs/heads/{branch}"), oid, true, "fixture branch")
            .expect("Failed to create branch");
    }
    repo.set_head(&format!("refs/heads/{}", branches[0]))
        .expect("Failed to set HEAD");
}
