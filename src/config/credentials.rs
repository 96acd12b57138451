//! Fetch credentials, resolved once per run

use std::collections::HashMap;
use std::fmt;

use super::{CredentialSource, Settings};
use crate::error::{InstallerError, Result};

/// Username/password pair for one backend
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BackendCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BackendCredentials {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct Resolved {
    credentials: BackendCredentials,
    missing: Vec<String>,
    required: bool,
}

/// Credentials for every configured backend
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    backends: HashMap<String, Resolved>,
}

impl Credentials {
    /// Resolve from the process environment
    pub fn from_env(settings: &Settings) -> Self {
        Self::resolve(settings, |var| std::env::var(var).ok())
    }

    /// Resolve through `lookup`, which maps an environment variable name to its value
    pub fn resolve(settings: &Settings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut backends = HashMap::new();

        for (name, backend) in &settings.backends {
            let mut missing = Vec::new();
            let mut read = |source: Option<&CredentialSource>| match source {
                None => None,
                Some(CredentialSource::Value(value)) => Some(value.clone()),
                Some(CredentialSource::Env(var)) => {
                    let value = lookup(var).filter(|v| !v.is_empty());
                    if value.is_none() {
                        missing.push(var.clone());
                    }
                    value
                }
            };

            let credentials = BackendCredentials {
                username: read(backend.credentials.username.as_ref()),
                password: read(backend.credentials.password.as_ref()),
            };

            backends.insert(
                name.clone(),
                Resolved {
                    credentials,
                    missing,
                    required: backend.credentials_required,
                },
            );
        }

        Self { backends }
    }

    /// Credentials for `backend`, failing when required ones are absent
    pub fn for_backend(&self, backend: &str) -> Result<BackendCredentials> {
        let Some(resolved) = self.backends.get(backend) else {
            return Ok(BackendCredentials::default());
        };

        if resolved.required && !resolved.missing.is_empty() {
            return Err(InstallerError::BackendUnavailable {
                backend: backend.to_string(),
                reason: format!("Missing credentials: {}", resolved.missing.join(", ")),
            });
        }

        Ok(resolved.credentials.clone())
    }
}
