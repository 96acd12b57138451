//! High-level operations behind the CLI commands
//!
//! - InstallOperation: fetch a product closure and assemble a workarea
//! - ListOperation: list installed products
//! - RepairOperation: bring the installer directory back in line with a product

pub mod install;
pub mod list;
pub mod repair;

pub use install::{InstallOperation, InstallOptions};
pub use list::{ListOperation, ListOptions};
pub use repair::RepairOperation;
