//! Command implementations for the workarea CLI

pub mod completions;
pub mod install;
pub mod list;
pub mod repair;

use std::path::PathBuf;

use crate::config::{Credentials, Settings};
use crate::error::Result;
use crate::provider::Selector;

/// Global options shared by every command that touches the installer directory
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub installer_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    /// Settings with command-line overrides applied on top of the config file
    pub fn settings(&self, providers: Option<Vec<String>>) -> Result<Settings> {
        Ok(Settings::load(self.config.as_deref())?
            .with_installer_dir(self.installer_dir.clone())
            .with_providers(providers))
    }
}

fn selector(settings: &Settings) -> Selector {
    Selector::from_settings(settings, Credentials::from_env(settings))
}
