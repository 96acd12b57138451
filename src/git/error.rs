//! Git error handling
//!
//! Turns libgit2 errors into short messages. HTTP failures are reported with
//! their status line (`404 Not Found`, `401 Unauthorized`, ...) so the
//! provider selector can condense them the same way as archive downloads.

use git2::{Error, ErrorClass, ErrorCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    NotFound,
    Unauthorized,
    Forbidden,
    ServerError,
    Connection,
    Timeout,
    Certificate,
    Other,
}

type Check = fn(&str, ErrorClass, ErrorCode) -> bool;

const CATEGORIES: &[(Check, Category)] = &[
    (
        |msg, _, code| {
            code == ErrorCode::NotFound
                || msg.contains("404")
                || msg.contains("not found")
                || msg.contains("too many redirects")
                || msg.contains("authentication replays")
        },
        Category::NotFound,
    ),
    (
        |msg, _, code| code == ErrorCode::Auth || msg.contains("401") || msg.contains("authentication"),
        Category::Unauthorized,
    ),
    (
        |msg, _, _| {
            msg.contains("403") || msg.contains("permission denied") || msg.contains("access denied")
        },
        Category::Forbidden,
    ),
    (|msg, _, _| msg.contains("500"), Category::ServerError),
    (
        |msg, _, _| msg.contains("timed out") || msg.contains("timeout"),
        Category::Timeout,
    ),
    (
        |msg, class, _| {
            class == ErrorClass::Net
                || msg.contains("failed to connect")
                || msg.contains("could not resolve")
                || msg.contains("connection")
        },
        Category::Connection,
    ),
    (
        |msg, class, code| {
            code == ErrorCode::Certificate
                || (class == ErrorClass::Http && (msg.contains("certificate") || msg.contains("ssl")))
        },
        Category::Certificate,
    ),
];

fn categorize(err: &Error) -> Category {
    let message = err.message().to_lowercase();
    CATEGORIES
        .iter()
        .find(|(check, _)| check(&message, err.class(), err.code()))
        .map_or(Category::Other, |(_, category)| *category)
}

/// Interpret a git2 error and provide a more user-friendly message
pub fn interpret_git_error(err: &Error) -> String {
    match categorize(err) {
        Category::NotFound => "Repository not found: 404 Not Found".to_string(),
        Category::Unauthorized => "Authentication failed: 401 Unauthorized".to_string(),
        Category::Forbidden => "Access denied: 403 Forbidden".to_string(),
        Category::ServerError => "Remote error: 500 Internal Server Error".to_string(),
        Category::Connection => format!("Connection failed: {}", err.message()),
        Category::Timeout => "Request timeout".to_string(),
        Category::Certificate => format!("Certificate error: {}", err.message()),
        Category::Other => match err.class() {
            ErrorClass::Http => format!("HTTP error: {}", err.message()),
            ErrorClass::Ssh => format!("SSH error: {}", err.message()),
            _ => err.message().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(class: ErrorClass, code: ErrorCode, message: &str) -> Error {
        Error::new(code, class, message)
    }

    #[test]
    fn test_not_found() {
        let err = error(
            ErrorClass::Http,
            ErrorCode::GenericError,
            "unexpected http status code: 404",
        );
        assert_eq!(interpret_git_error(&err), "Repository not found: 404 Not Found");
    }

    #[test]
    fn test_auth() {
        let err = error(ErrorClass::Http, ErrorCode::Auth, "remote authentication required");
        assert!(interpret_git_error(&err).contains("401 Unauthorized"));
    }

    #[test]
    fn test_connection() {
        let err = error(
            ErrorClass::Net,
            ErrorCode::GenericError,
            "failed to resolve address for nohost: Name or service not known",
        );
        assert!(interpret_git_error(&err).starts_with("Connection failed"));
    }

    #[test]
    fn test_other_keeps_message() {
        let err = error(ErrorClass::Reference, ErrorCode::GenericError, "reference is locked");
        assert_eq!(interpret_git_error(&err), "reference is locked");
    }
}
