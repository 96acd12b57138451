//! Installer configuration
//!
//! Settings are read from a YAML file when one exists and fall back to
//! built-in defaults otherwise. The file is looked up in this order:
//!
//! 1. the path given with `--config`
//! 2. `WORKAREA_CONFIG`
//! 3. `<config dir>/workarea/config.yaml`
//!
//! ```yaml
//! installer_dir: /opt/installer
//! providers: [nexus, github]
//! backends:
//!   github:
//!     kind: libgit2
//!     url: https://github.com/acme/{name}.git
//!     branches: [main, dev]
//!     credentials:
//!       username: { value: git }
//!       password: { env: GITHUB_TOKEN }
//! ```

pub mod credentials;
pub mod lockfile;
pub mod placement;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InstallerError, Result};

pub use credentials::{BackendCredentials, Credentials};

pub const CONFIG_ENV: &str = "WORKAREA_CONFIG";
pub const THIRD_PARTY_ENV: &str = "WORKAREA_THIRD_PARTY_DIR";

const CONFIG_DIR: &str = "workarea";
const CONFIG_FILE: &str = "config.yaml";

/// Driver behind a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Git through libgit2
    Libgit2,
    /// Git through the `git` executable
    GitCli,
    /// Tarball downloads from an artifact repository
    Archive,
}

/// Where one credential value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Name of an environment variable
    Env(String),
    /// A literal value, for non-secret parts such as a fixed user name
    Value(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<CredentialSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<CredentialSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Repository location with `{name}` and `{branch}` placeholders
    pub url: String,
    /// Location checked by `check_remote_repository_exists`; defaults to `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists_url: Option<String>,
    /// Branches tried after the requested one, in order
    pub branches: Vec<String>,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub credentials_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory products are fetched into, one subdirectory per product
    pub installer_dir: PathBuf,
    /// Backend names in fallback order
    pub providers: Vec<String>,
    pub backends: BTreeMap<String, BackendSettings>,
    /// Root that `link.external` sources resolve against
    pub third_party_dir: Option<PathBuf>,
    /// The installer's own product, never removed by repair
    pub installer_product: String,
}

impl Default for Settings {
    fn default() -> Self {
        let installer_dir = dirs::home_dir()
            .map_or_else(|| PathBuf::from("installer"), |home| home.join("dev").join("installer"));

        let mut backends = BTreeMap::new();
        backends.insert(
            "nexus".to_string(),
            BackendSettings {
                kind: BackendKind::Archive,
                url: "https://nexus.konverso.ai/repository/kbot_raw/{branch}/{name}/{name}_latest.tar.gz"
                    .to_string(),
                exists_url: Some(
                    "https://nexus.konverso.ai/repository/kbot_raw/{name}.tar.gz".to_string(),
                ),
                branches: vec!["master".to_string(), "dev".to_string()],
                credentials: CredentialSettings {
                    username: Some(CredentialSource::Env("NEXUS_USERNAME".to_string())),
                    password: Some(CredentialSource::Env("NEXUS_PASSWORD".to_string())),
                },
                credentials_required: true,
            },
        );
        backends.insert(
            "github".to_string(),
            BackendSettings {
                kind: BackendKind::Libgit2,
                url: "https://github.com/konverso-ai/{name}.git".to_string(),
                exists_url: None,
                branches: vec!["main".to_string(), "dev".to_string()],
                credentials: CredentialSettings {
                    username: Some(CredentialSource::Value("git".to_string())),
                    password: Some(CredentialSource::Env("GITHUB_TOKEN".to_string())),
                },
                credentials_required: false,
            },
        );
        backends.insert(
            "bitbucket".to_string(),
            BackendSettings {
                kind: BackendKind::Libgit2,
                url: "https://bitbucket.org/konversoai/{name}.git".to_string(),
                exists_url: None,
                branches: vec!["master".to_string(), "dev".to_string()],
                credentials: CredentialSettings {
                    username: Some(CredentialSource::Env("BITBUCKET_USERNAME".to_string())),
                    password: Some(CredentialSource::Env("BITBUCKET_APP_PASSWORD".to_string())),
                },
                credentials_required: false,
            },
        );

        Self {
            installer_dir,
            providers: vec![
                "nexus".to_string(),
                "github".to_string(),
                "bitbucket".to_string(),
            ],
            backends,
            third_party_dir: None,
            installer_product: "installer".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, `WORKAREA_CONFIG` or the default location.
    ///
    /// A missing file at the default location yields the built-in defaults;
    /// a missing file that was asked for explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut settings = match requested {
            Some(path) => {
                if !path.is_file() {
                    return Err(InstallerError::ConfigInvalid {
                        message: format!("configuration file {} does not exist", path.display()),
                    });
                }
                Self::from_file(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Some(dir) = std::env::var_os(THIRD_PARTY_ENV) {
            settings.third_party_dir = Some(PathBuf::from(dir));
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| InstallerError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::from_yaml(&content, path)
    }

    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| InstallerError::ConfigParseFailed {
            path: origin.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            if backend.branches.is_empty() {
                return Err(InstallerError::ConfigInvalid {
                    message: format!("backend '{name}' must list at least one fallback branch"),
                });
            }
            if !backend.url.contains("{name}") {
                return Err(InstallerError::ConfigInvalid {
                    message: format!("backend '{name}' url must contain a {{name}} placeholder"),
                });
            }
        }
        if self.providers.is_empty() {
            return Err(InstallerError::ConfigInvalid {
                message: "at least one provider must be configured".to_string(),
            });
        }
        Ok(())
    }

    /// Replace the provider order, e.g. from `--uses`
    pub fn with_providers(mut self, providers: Option<Vec<String>>) -> Self {
        if let Some(providers) = providers.filter(|p| !p.is_empty()) {
            self.providers = providers;
        }
        self
    }

    pub fn with_installer_dir(mut self, installer_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = installer_dir {
            self.installer_dir = dir;
        }
        self
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Substitute `{name}` and `{branch}` in a URL template
pub fn expand_template(template: &str, name: &str, branch: &str) -> String {
    template.replace("{name}", name).replace("{branch}", branch)
}
