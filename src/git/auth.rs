//! Git authentication configuration
//!
//! Credentials configured for a backend are offered first. Without them,
//! authentication falls back to git's native mechanisms:
//! - SSH agent and keys from ~/.ssh/
//! - Git credential helpers

use git2::{Cred, CredentialType, Error, ErrorClass, ErrorCode, RemoteCallbacks};

use crate::config::BackendCredentials;

fn auth_error(message: &str) -> Error {
    Error::new(ErrorCode::Auth, ErrorClass::Http, message)
}

fn try_ssh_keys(username: &str) -> std::result::Result<Cred, Error> {
    let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");

    for key_name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
        let private_key = ssh_dir.join(key_name);
        if !private_key.exists() {
            continue;
        }
        let public_key = ssh_dir.join(format!("{key_name}.pub"));
        let public_key = public_key.exists().then_some(public_key.as_path());

        if let Ok(cred) = Cred::ssh_key(username, public_key, &private_key, None) {
            return Ok(cred);
        }
    }

    Err(auth_error("SSH key not found"))
}

fn try_credential_helper(
    url: &str,
    username_from_url: Option<&str>,
) -> std::result::Result<Cred, Error> {
    let config = git2::Config::open_default().or_else(|_| git2::Config::new())?;

    Cred::credential_helper(&config, url, username_from_url)
        .or_else(|_| Cred::userpass_plaintext(username_from_url.unwrap_or("git"), ""))
}

/// Set up authentication callbacks for git operations.
///
/// libgit2 calls the callback again after a rejected attempt, so configured
/// credentials are offered once and then the native mechanisms take over.
pub fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>, credentials: &BackendCredentials) {
    let credentials = credentials.clone();
    let mut offered_configured = false;

    callbacks.credentials(move |url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) && !offered_configured {
            if let Some(password) = credentials.password.as_deref() {
                offered_configured = true;
                let username = credentials
                    .username
                    .as_deref()
                    .or(username_from_url)
                    .unwrap_or("git");
                return Cred::userpass_plaintext(username, password);
            }
        }

        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(username).or_else(|_| try_ssh_keys(username));
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return try_credential_helper(url, username_from_url);
        }

        Err(auth_error("authentication failed"))
    });
}
