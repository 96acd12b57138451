//! CLI definitions using clap derive API
//!
//! One submodule per command's argument type:
//! - install: Install command arguments
//! - list: List command arguments
//! - repair: Repair command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod completions;
pub mod install;
pub mod list;
pub mod repair;

pub use completions::CompletionsArgs;
pub use install::InstallArgs;
pub use list::ListArgs;
pub use repair::RepairArgs;

/// Workarea - dependency-aware product installer
///
/// Fetch a product and its parents from the configured providers and assemble them into a workarea.
#[derive(Parser, Debug)]
#[command(
    name = "workarea",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Dependency-aware installer for modular products",
    long_about = "Workarea resolves the parent closure of a product, fetches every product \
                  from the first provider that holds it, and composes their placement \
                  directives into one workarea.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  workarea install kbot                        \x1b[90m# Fetch kbot and its parents\x1b[0m\n   \
                  workarea install kbot -V 5.2 --workarea ~/w  \x1b[90m# Fetch release-5.2 and assemble ~/w\x1b[0m\n   \
                  workarea list --tree                         \x1b[90m# Show installed dependency trees\x1b[0m\n   \
                  workarea repair kbot                         \x1b[90m# Fix missing or stray products\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Installer directory holding fetched products
    #[arg(long, global = true, env = "WORKAREA_INSTALLER_DIR")]
    pub installer_dir: Option<PathBuf>,

    /// Configuration file (defaults to WORKAREA_CONFIG or the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a product with its dependencies and optionally assemble a workarea
    Install(InstallArgs),

    /// List installed products
    List(ListArgs),

    /// Re-fetch broken products and remove products outside a closure
    Repair(RepairArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
