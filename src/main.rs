//! Workarea - dependency-aware product installer
//!
//! Resolves the parent closure of a product, fetches each product from the
//! first configured provider that holds it, records the result in a lock
//! manifest and composes the products' placement directives into a workarea.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod error;
mod git;
mod installer;
mod operations;
mod product;
mod provider;
mod resolver;
mod temp;
#[cfg(test)]
mod test_fixtures;
mod ui;
mod versioner;

use cli::{Cli, Commands};
use commands::GlobalOptions;

const LOG_ENV: &str = "WORKAREA_LOG";

/// `WORKAREA_LOG` wins; otherwise `warn`, or `debug` with `--verbose`
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }))
}

fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let global = GlobalOptions {
        installer_dir: cli.installer_dir,
        config: cli.config,
    };

    match cli.command {
        Commands::Install(args) => commands::install::run(&global, args)?,
        Commands::List(args) => commands::list::run(&global, args)?,
        Commands::Repair(args) => commands::repair::run(&global, args)?,
        Commands::Completions(args) => commands::completions::run(args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_log_filter_defaults() {
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        assert_eq!(log_filter(false).to_string(), "warn");
        assert_eq!(log_filter(true).to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_log_filter_env_override() {
        unsafe {
            std::env::set_var(LOG_ENV, "trace");
        }
        assert_eq!(log_filter(false).to_string(), "trace");
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
    }
}
