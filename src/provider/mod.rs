//! Fetch providers
//!
//! A [`Provider`] binds one configured backend (URL template, fallback
//! branches, credentials) to the [`Versioner`] that drives it. The
//! [`Selector`] composes providers with ordered fallback.

pub mod selector;

use std::path::Path;

use tracing::debug;

use crate::config::{BackendCredentials, BackendSettings, expand_template};
use crate::error::Result;
use crate::versioner::{self, Versioner};

pub use selector::{Backend, BackendFactory, RepositoryRef, Selector, concise_cause};

pub struct Provider {
    name: String,
    settings: BackendSettings,
    versioner: Box<dyn Versioner>,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        settings: BackendSettings,
        credentials: BackendCredentials,
    ) -> Result<Self> {
        let versioner = versioner::for_backend(&settings, credentials)?;
        Ok(Self {
            name: name.into(),
            settings,
            versioner,
        })
    }

    /// Location of `repository` for `branch`
    pub fn repository_url(&self, repository: &RepositoryRef, branch: &str) -> String {
        match repository {
            RepositoryRef::Name(name) => expand_template(&self.settings.url, name, branch),
            RepositoryRef::Url(url) => url.clone(),
        }
    }
}

impl Backend for Provider {
    fn name(&self) -> &str {
        &self.name
    }

    fn branches(&self) -> &[String] {
        &self.settings.branches
    }

    fn clone_and_checkout(
        &self,
        target: &Path,
        branch: &str,
        repository: &RepositoryRef,
    ) -> Result<()> {
        let url = self.repository_url(repository, branch);
        debug!(
            "{} ({}) fetching {} at '{}'",
            self.name,
            self.versioner.name(),
            repository.display_name(),
            branch
        );

        self.versioner.clone_repository(&url, target)?;
        if self.versioner.supports_branches() {
            self.versioner.checkout(target, branch)?;
        }
        Ok(())
    }

    fn check_remote_repository_exists(&self, repository: &RepositoryRef) -> bool {
        let url = match repository {
            RepositoryRef::Name(name) => {
                let template = self.settings.exists_url.as_deref().unwrap_or(&self.settings.url);
                let branch = self.settings.branches.first().map_or("", String::as_str);
                expand_template(template, name, branch)
            }
            RepositoryRef::Url(url) => url.clone(),
        };
        self.versioner.check_remote_repository_exists(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use git2::{Repository, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn git_settings(template: &str) -> BackendSettings {
        BackendSettings {
            kind: BackendKind::Libgit2,
            url: template.to_string(),
            exists_url: None,
            branches: vec!["master".to_string(), "dev".to_string()],
            credentials: Default::default(),
            credentials_required: false,
        }
    }

    fn seed_origin(root: &Path, name: &str, branches: &[&str]) {
        let path = root.join(name);
        let repo = Repository::init(&path).unwrap();
        fs::write(path.join("description.xml"), format!("<product name=\"{name}\"/>")).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("description.xml")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Test", "test@example.com").unwrap();
        let commit = repo
            .commit(Some("HEAD"), &signature, &signature, "init", &tree, &[])
            .unwrap();
        let commit = repo.find_commit(commit).unwrap();
        for branch in branches {
            if repo.find_branch(branch, git2::BranchType::Local).is_err() {
                repo.branch(branch, &commit, false).unwrap();
            }
        }
    }

    #[test]
    fn test_name_is_expanded_through_template() {
        let provider = Provider::new(
            "github",
            git_settings("https://github.com/acme/{name}.git"),
            BackendCredentials::default(),
        )
        .unwrap();
        assert_eq!(
            provider.repository_url(&RepositoryRef::Name("kbot".to_string()), "dev"),
            "https://github.com/acme/kbot.git"
        );
        assert_eq!(
            provider.repository_url(&RepositoryRef::Url("file:///x".to_string()), "dev"),
            "file:///x"
        );
    }

    #[test]
    fn test_clone_and_checkout_local_repository() {
        let temp = TempDir::new().unwrap();
        let origins = temp.path().join("origins");
        seed_origin(&origins, "kbot", &["master", "dev"]);

        let template = format!("file://{}/{{name}}", origins.display());
        let provider =
            Provider::new("local", git_settings(&template), BackendCredentials::default()).unwrap();
        let repository = RepositoryRef::Name("kbot".to_string());

        let target = temp.path().join("installer").join("kbot");
        provider.clone_and_checkout(&target, "dev", &repository).unwrap();

        assert!(target.join("description.xml").is_file());
        assert_eq!(crate::git::current_branch(&target).as_deref(), Some("dev"));
        assert!(provider.check_remote_repository_exists(&repository));
        assert!(!provider.check_remote_repository_exists(&RepositoryRef::Name("none".to_string())));
    }
}
