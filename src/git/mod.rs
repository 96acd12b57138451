//! Git plumbing shared by the version-control backends
//!
//! - [`clone`]: cloning, fetching and remote probing through libgit2
//! - [`checkout`]: branch checkout and inspection
//! - [`auth`]: credential callbacks
//! - [`error`]: readable libgit2 error messages
//! - [`url`]: URL normalization, credential embedding and redaction

pub mod auth;
pub mod checkout;
pub mod clone;
pub mod error;
pub mod url;

pub use checkout::{branch_exists, checkout_branch, current_branch, list_branches};
pub use clone::{clone, fetch_origin, remote_exists};
