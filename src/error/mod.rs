//! Error types and handling for the workarea installer
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//! Variants are grouped by the layer that raises them: descriptors, fetch
//! backends, the dependency graph, configuration, the lock manifest and the
//! file system.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for installer operations
#[derive(Error, Diagnostic, Debug)]
pub enum InstallerError {
    // Descriptor errors
    #[error("Failed to parse descriptor {path}: {reason}")]
    #[diagnostic(code(workarea::descriptor::parse_failed))]
    DescriptorParseFailed { path: String, reason: String },

    #[error("Descriptor {path} is missing the required 'name' field")]
    #[diagnostic(code(workarea::descriptor::missing_name))]
    DescriptorMissingName { path: String },

    #[error("Product name mismatch: markup descriptor says '{markup}', data descriptor says '{data}'")]
    #[diagnostic(
        code(workarea::descriptor::name_mismatch),
        help("description.xml and description.json must declare the same product name")
    )]
    DescriptorNameMismatch { markup: String, data: String },

    #[error("No product descriptor found in {path}")]
    #[diagnostic(
        code(workarea::descriptor::not_found),
        help("A product directory must contain a description.xml file")
    )]
    DescriptorNotFound { path: String },

    #[error("Product '{name}' not found")]
    #[diagnostic(code(workarea::product::not_found))]
    ProductNotFound { name: String },

    // Fetch errors
    #[error("Invalid repository reference: {message}")]
    #[diagnostic(
        code(workarea::fetch::invalid_reference),
        help("Provide exactly one of a repository name or a repository URL")
    )]
    InvalidRepositoryRef { message: String },

    #[error("Backend '{backend}' is unavailable: {reason}")]
    #[diagnostic(code(workarea::fetch::backend_unavailable))]
    BackendUnavailable { backend: String, reason: String },

    #[error("Operation '{operation}' is unsupported for this backend ({backend})")]
    #[diagnostic(code(workarea::fetch::unsupported))]
    UnsupportedOperation { backend: String, operation: String },

    #[error("Version '{version}' not found. Available versions: {available}")]
    #[diagnostic(code(workarea::fetch::version_not_found))]
    VersionNotFound { version: String, available: String },

    #[error("Git operation failed: {message}")]
    #[diagnostic(code(workarea::git::operation_failed))]
    GitOperationFailed { message: String },

    #[error("Failed to clone repository: {url}: {reason}")]
    #[diagnostic(
        code(workarea::git::clone_failed),
        help("Check that URL is correct and you have access to repository")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to checkout '{branch}': {reason}")]
    #[diagnostic(code(workarea::git::checkout_failed))]
    GitCheckoutFailed { branch: String, reason: String },

    #[error("Failed to download {url}: {reason}")]
    #[diagnostic(code(workarea::archive::download_failed))]
    DownloadFailed { url: String, reason: String },

    #[error("Failed to extract archive into {path}: {reason}")]
    #[diagnostic(code(workarea::archive::extract_failed))]
    ExtractFailed { path: String, reason: String },

    #[error("All providers failed to clone repository '{repository}':\n{details}")]
    #[diagnostic(
        code(workarea::fetch::all_failed),
        help("Check the provider order with --uses and the credentials of each provider")
    )]
    AllBackendsFailed { repository: String, details: String },

    // Graph errors
    #[error("Circular dependency detected: {chain}")]
    #[diagnostic(
        code(workarea::deps::circular),
        help("Remove the circular dependency from the products' parent lists")
    )]
    CircularDependency { chain: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(workarea::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(workarea::config::invalid))]
    ConfigInvalid { message: String },

    #[error("Unknown shell: {shell}")]
    #[diagnostic(
        code(workarea::cli::unknown_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnknownShell { shell: String },

    #[error("Failed to parse placement manifest {path}: {reason}")]
    #[diagnostic(code(workarea::placement::parse_failed))]
    PlacementParseFailed { path: String, reason: String },

    // Lock manifest errors
    #[error("Failed to parse lock manifest {path}: {reason}")]
    #[diagnostic(
        code(workarea::lockfile::parse_failed),
        help("Delete the lock manifest and run 'workarea install' again")
    )]
    LockfileParseFailed { path: String, reason: String },

    // File system errors
    #[error("Failed to read file: {path}")]
    #[diagnostic(code(workarea::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(workarea::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("Failed to place {path}: {reason}")]
    #[diagnostic(code(workarea::fs::placement_failed))]
    PlacementFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(workarea::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for InstallerError {
    fn from(err: std::io::Error) -> Self {
        InstallerError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for InstallerError {
    fn from(err: serde_yaml::Error) -> Self {
        InstallerError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for InstallerError {
    fn from(err: serde_json::Error) -> Self {
        InstallerError::LockfileParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<git2::Error> for InstallerError {
    fn from(err: git2::Error) -> Self {
        InstallerError::GitOperationFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, InstallerError>;
