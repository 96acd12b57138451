//! Ordered backend fallback
//!
//! The [`Selector`] walks its backend list in order. Each backend is built
//! only when its turn comes, with the credentials resolved when the
//! selector was created. Within one backend, the requested branch and then
//! the configured fallback branches are tried. The first success wins and
//! is recorded; when every backend fails, one aggregated error lists a
//! short cause per backend.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::Provider;
use crate::config::{BackendSettings, Credentials, Settings};
use crate::error::{InstallerError, Result};

/// How a repository is identified: by name (expanded through each
/// backend's URL template) or by a literal URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryRef {
    Name(String),
    Url(String),
}

impl RepositoryRef {
    /// Exactly one of `name` and `url` must be given
    pub fn from_parts(name: Option<&str>, url: Option<&str>) -> Result<Self> {
        match (name.filter(|n| !n.is_empty()), url.filter(|u| !u.is_empty())) {
            (Some(_), Some(_)) => Err(InstallerError::InvalidRepositoryRef {
                message: "Cannot specify both repository_url and repository_name".to_string(),
            }),
            (None, None) => Err(InstallerError::InvalidRepositoryRef {
                message: "Must specify either repository_url or repository_name".to_string(),
            }),
            (Some(name), None) => Ok(Self::Name(name.to_string())),
            (None, Some(url)) => Ok(Self::Url(url.to_string())),
        }
    }

    /// Name used in messages
    pub fn display_name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Url(name) => name,
        }
    }
}

/// One configured fetch source
pub trait Backend {
    fn name(&self) -> &str;

    /// Fallback branches, in order
    fn branches(&self) -> &[String];

    /// Fetch `repository` into `target` and check out `branch`
    fn clone_and_checkout(
        &self,
        target: &Path,
        branch: &str,
        repository: &RepositoryRef,
    ) -> Result<()>;

    fn check_remote_repository_exists(&self, repository: &RepositoryRef) -> bool;
}

/// Builds backends by name
pub trait BackendFactory {
    fn create(&self, name: &str) -> Result<Box<dyn Backend>>;
}

/// Factory over the backends declared in [`Settings`]
pub struct ConfiguredBackends {
    backends: BTreeMap<String, BackendSettings>,
    credentials: Credentials,
}

impl ConfiguredBackends {
    pub fn new(settings: &Settings, credentials: Credentials) -> Self {
        Self {
            backends: settings.backends.clone(),
            credentials,
        }
    }
}

impl BackendFactory for ConfiguredBackends {
    fn create(&self, name: &str) -> Result<Box<dyn Backend>> {
        let settings = self
            .backends
            .get(name)
            .ok_or_else(|| InstallerError::BackendUnavailable {
                backend: name.to_string(),
                reason: "Provider not available".to_string(),
            })?;
        let credentials = self.credentials.for_backend(name)?;
        Ok(Box::new(Provider::new(name, settings.clone(), credentials)?))
    }
}

/// Which backend and branch a successful fetch used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub backend: String,
    pub branch: String,
}

pub struct Selector {
    providers: Vec<String>,
    factory: Box<dyn BackendFactory>,
    last_used: Option<FetchOutcome>,
}

impl Selector {
    pub fn new(providers: Vec<String>, factory: Box<dyn BackendFactory>) -> Self {
        Self {
            providers,
            factory,
            last_used: None,
        }
    }

    pub fn from_settings(settings: &Settings, credentials: Credentials) -> Self {
        Self::new(
            settings.providers.clone(),
            Box::new(ConfiguredBackends::new(settings, credentials)),
        )
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Backend and branch of the last successful fetch
    pub fn last_used(&self) -> Option<&FetchOutcome> {
        self.last_used.as_ref()
    }

    /// Fetch a repository given by name or by URL, exactly one of which must be set
    pub fn clone_and_checkout(
        &mut self,
        target: &Path,
        branch: Option<&str>,
        repository_name: Option<&str>,
        repository_url: Option<&str>,
    ) -> Result<FetchOutcome> {
        let repository = RepositoryRef::from_parts(repository_name, repository_url)?;
        self.fetch(target, branch, &repository)
    }

    pub fn fetch(
        &mut self,
        target: &Path,
        branch: Option<&str>,
        repository: &RepositoryRef,
    ) -> Result<FetchOutcome> {
        let mut failures: Vec<(String, String)> = Vec::new();

        for name in &self.providers {
            info!(
                "Attempting to fetch '{}' with provider {}",
                repository.display_name(),
                name
            );

            let backend = match self.factory.create(name) {
                Ok(backend) => backend,
                Err(err) => {
                    let cause = match err {
                        InstallerError::BackendUnavailable { reason, .. } => reason,
                        other => concise_cause(&other.to_string()),
                    };
                    warn!("Provider {} unavailable: {}", name, cause);
                    failures.push((name.clone(), cause));
                    continue;
                }
            };

            match try_branches(backend.as_ref(), target, branch, repository) {
                Ok(used) => {
                    info!(
                        "Fetched '{}' with provider {} (branch {})",
                        repository.display_name(),
                        name,
                        used
                    );
                    let outcome = FetchOutcome {
                        backend: name.clone(),
                        branch: used,
                    };
                    self.last_used = Some(outcome.clone());
                    return Ok(outcome);
                }
                Err(err) => {
                    let cause = concise_cause(&err.to_string());
                    warn!("Provider {} failed for '{}': {}", name, repository.display_name(), cause);
                    failures.push((name.clone(), cause));
                }
            }
        }

        Err(InstallerError::AllBackendsFailed {
            repository: repository.display_name().to_string(),
            details: failures
                .iter()
                .map(|(name, cause)| format!("• {name}: {cause}"))
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }

    /// Whether any backend knows the repository
    pub fn check_remote_repository_exists(&self, repository: &RepositoryRef) -> bool {
        self.providers.iter().any(|name| match self.factory.create(name) {
            Ok(backend) => {
                let exists = backend.check_remote_repository_exists(repository);
                debug!("Provider {} has '{}': {}", name, repository.display_name(), exists);
                exists
            }
            Err(err) => {
                debug!("Provider {} skipped: {}", name, err);
                false
            }
        })
    }
}

/// Try each candidate branch on one backend, returning the branch that worked
fn try_branches(
    backend: &dyn Backend,
    target: &Path,
    requested: Option<&str>,
    repository: &RepositoryRef,
) -> Result<String> {
    let candidates = candidate_branches(requested, backend.branches());
    let mut last_error = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match backend.clone_and_checkout(target, candidate, repository) {
            Ok(()) => {
                if requested.is_some_and(|r| r != candidate) {
                    info!(
                        "Used fallback branch '{}' on {} (requested '{}' not found)",
                        candidate,
                        backend.name(),
                        requested.unwrap_or_default()
                    );
                }
                return Ok(candidate.clone());
            }
            Err(err) => {
                let retry = is_branch_error(&err.to_string()) && index + 1 < candidates.len();
                if !retry {
                    return Err(err);
                }
                debug!("Branch '{}' not usable on {}: {}", candidate, backend.name(), err);
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| InstallerError::BackendUnavailable {
        backend: backend.name().to_string(),
        reason: "no branch to try".to_string(),
    }))
}

/// `[requested, ...fallbacks]` without duplicates, or the first fallback alone
pub fn candidate_branches(requested: Option<&str>, fallbacks: &[String]) -> Vec<String> {
    match requested.filter(|b| !b.is_empty()) {
        Some(requested) => {
            let mut candidates = vec![requested.to_string()];
            for fallback in fallbacks {
                if !candidates.contains(fallback) {
                    candidates.push(fallback.clone());
                }
            }
            candidates
        }
        None => fallbacks.iter().take(1).cloned().collect(),
    }
}

fn is_branch_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found") || message.contains("branch") || message.contains("version")
}

/// Reduce a backend error message to a short cause
pub fn concise_cause(message: &str) -> String {
    const HTTP_CAUSES: [(&str, &str); 4] = [
        ("404 Not Found", "Repository not found (404)"),
        ("401 Unauthorized", "Authentication failed (401)"),
        ("403 Forbidden", "Access forbidden (403)"),
        ("500 Internal Server Error", "Server error (500)"),
    ];

    if let Some((_, cause)) = HTTP_CAUSES.iter().find(|(status, _)| message.contains(status)) {
        return (*cause).to_string();
    }
    if message.contains("Connection") && message.contains("failed") {
        return "Connection failed".to_string();
    }
    if message.to_lowercase().contains("timeout") {
        return "Request timeout".to_string();
    }

    let verbatim = (message.contains("Version") && message.contains("not found"))
        || (message.contains("Repository") && message.contains("not found"))
        || message.contains("Authentication failed")
        || message.to_lowercase().contains("auth");
    if verbatim {
        return message.to_string();
    }

    match message.rsplit_once(':') {
        Some((_, tail)) => tail.trim().to_string(),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    #[derive(Clone)]
    enum Behavior {
        /// Every attempt fails with this message
        Fail(&'static str),
        /// Succeeds only for these branches; others raise "Version not found"
        Branches(Vec<&'static str>),
    }

    struct FakeBackend {
        name: String,
        branches: Vec<String>,
        behavior: Behavior,
        log: CallLog,
    }

    impl Backend for FakeBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn branches(&self) -> &[String] {
            &self.branches
        }

        fn clone_and_checkout(
            &self,
            _target: &Path,
            branch: &str,
            _repository: &RepositoryRef,
        ) -> Result<()> {
            self.log.borrow_mut().push(format!("{}@{}", self.name, branch));
            match &self.behavior {
                Behavior::Fail(message) => Err(InstallerError::GitOperationFailed {
                    message: (*message).to_string(),
                }),
                Behavior::Branches(ok) if ok.iter().any(|b| *b == branch) => Ok(()),
                Behavior::Branches(_) => Err(InstallerError::VersionNotFound {
                    version: branch.to_string(),
                    available: "dev, master".to_string(),
                }),
            }
        }

        fn check_remote_repository_exists(&self, _repository: &RepositoryRef) -> bool {
            matches!(self.behavior, Behavior::Branches(_))
        }
    }

    struct FakeFactory {
        behaviors: HashMap<&'static str, Behavior>,
        created: CallLog,
        log: CallLog,
    }

    impl BackendFactory for FakeFactory {
        fn create(&self, name: &str) -> Result<Box<dyn Backend>> {
            self.created.borrow_mut().push(name.to_string());
            let behavior = self.behaviors.get(name).cloned().ok_or_else(|| {
                InstallerError::BackendUnavailable {
                    backend: name.to_string(),
                    reason: "Missing credentials: NEXUS_USERNAME".to_string(),
                }
            })?;
            Ok(Box::new(FakeBackend {
                name: name.to_string(),
                branches: vec!["master".to_string(), "dev".to_string()],
                behavior,
                log: Rc::clone(&self.log),
            }))
        }
    }

    fn selector(
        providers: &[&str],
        behaviors: Vec<(&'static str, Behavior)>,
    ) -> (Selector, CallLog, CallLog) {
        let created = CallLog::default();
        let log = CallLog::default();
        let factory = FakeFactory {
            behaviors: behaviors.into_iter().collect(),
            created: Rc::clone(&created),
            log: Rc::clone(&log),
        };
        let providers = providers.iter().map(|p| (*p).to_string()).collect();
        (Selector::new(providers, Box::new(factory)), created, log)
    }

    #[test]
    fn test_falls_through_to_next_backend() {
        let (mut selector, created, _) = selector(
            &["nexus", "github", "bitbucket"],
            vec![
                ("nexus", Behavior::Fail("Repository not found: 404 Not Found")),
                ("github", Behavior::Branches(vec!["master"])),
                ("bitbucket", Behavior::Branches(vec!["master"])),
            ],
        );

        let outcome = selector
            .clone_and_checkout(Path::new("/tmp/kbot"), None, Some("kbot"), None)
            .unwrap();

        assert_eq!(outcome.backend, "github");
        assert_eq!(selector.last_used(), Some(&outcome));
        assert_eq!(*created.borrow(), vec!["nexus", "github"]);
    }

    #[test]
    fn test_branch_fallback_records_branch_used() {
        let (mut selector, _, log) = selector(
            &["github"],
            vec![("github", Behavior::Branches(vec!["dev"]))],
        );

        let outcome = selector
            .fetch(
                Path::new("/tmp/kbot"),
                Some("release-2025.03"),
                &RepositoryRef::Name("kbot".to_string()),
            )
            .unwrap();

        assert_eq!(outcome.branch, "dev");
        assert_eq!(
            *log.borrow(),
            vec!["github@release-2025.03", "github@master", "github@dev"]
        );
    }

    #[test]
    fn test_non_branch_error_stops_backend() {
        let (mut selector, _, log) = selector(
            &["github"],
            vec![("github", Behavior::Fail("SSL handshake aborted"))],
        );

        let err = selector
            .fetch(
                Path::new("/tmp/kbot"),
                Some("dev"),
                &RepositoryRef::Name("kbot".to_string()),
            )
            .unwrap_err();

        assert_eq!(*log.borrow(), vec!["github@dev"]);
        assert!(err.to_string().contains("• github: SSL handshake aborted"));
    }

    #[test]
    fn test_all_backends_failed_aggregates_causes() {
        let (mut selector, _, _) = selector(
            &["nexus", "github"],
            vec![("github", Behavior::Branches(vec![]))],
        );

        let err = selector
            .fetch(
                Path::new("/tmp/kbot"),
                Some("release-9"),
                &RepositoryRef::Name("kbot".to_string()),
            )
            .unwrap_err();
        let message = err.to_string();

        assert!(message.starts_with("All providers failed to clone repository 'kbot':"));
        assert!(message.contains("• nexus: Missing credentials: NEXUS_USERNAME"));
        assert!(message.contains("• github: Version 'dev' not found"));
        assert!(selector.last_used().is_none());
    }

    #[test]
    fn test_repository_ref_requires_exactly_one_form() {
        assert!(RepositoryRef::from_parts(Some("kbot"), Some("https://x/kbot.git")).is_err());
        assert!(RepositoryRef::from_parts(None, None).is_err());
        assert_eq!(
            RepositoryRef::from_parts(None, Some("https://x/kbot.git")).unwrap(),
            RepositoryRef::Url("https://x/kbot.git".to_string())
        );
    }

    #[test]
    fn test_remote_exists_checks_each_backend() {
        let (selector, _, _) = selector(
            &["nexus", "github"],
            vec![("github", Behavior::Branches(vec!["master"]))],
        );
        assert!(selector.check_remote_repository_exists(&RepositoryRef::Name("kbot".to_string())));
    }

    #[test]
    fn test_candidate_branches() {
        let fallbacks = vec!["master".to_string(), "dev".to_string()];
        assert_eq!(
            candidate_branches(Some("dev"), &fallbacks),
            vec!["dev", "master"]
        );
        assert_eq!(
            candidate_branches(Some("release-1"), &fallbacks),
            vec!["release-1", "master", "dev"]
        );
        assert_eq!(candidate_branches(None, &fallbacks), vec!["master"]);
        assert!(candidate_branches(None, &[]).is_empty());
    }

    #[test]
    fn test_concise_cause() {
        assert_eq!(
            concise_cause("Failed to download https://n/x.tar.gz: 404 Not Found"),
            "Repository not found (404)"
        );
        assert_eq!(
            concise_cause("HTTP error: 401 Unauthorized"),
            "Authentication failed (401)"
        );
        assert_eq!(concise_cause("Access denied: 403 Forbidden"), "Access forbidden (403)");
        assert_eq!(
            concise_cause("Remote error: 500 Internal Server Error"),
            "Server error (500)"
        );
        assert_eq!(
            concise_cause("Failed to download u: Connection failed: dns error"),
            "Connection failed"
        );
        assert_eq!(concise_cause("operation Timeout reached"), "Request timeout");
        assert_eq!(
            concise_cause("Version 'release-9' not found. Available versions: dev"),
            "Version 'release-9' not found. Available versions: dev"
        );
        assert_eq!(
            concise_cause("Git operation failed: fetch failed: object missing"),
            "object missing"
        );
        assert_eq!(concise_cause("plain"), "plain");
    }
}
