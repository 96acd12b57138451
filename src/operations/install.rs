//! Install operation
//!
//! Fetches the closure of a product into the installer directory, writes
//! the lock manifest and, when a workarea is given, assembles it.

use std::path::PathBuf;

use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::installer::{InstallSummary, WorkareaInstaller};
use crate::product::ProductCollection;
use crate::provider::Selector;
use crate::resolver::{Discovery, DiscoveryRequest};
use crate::ui::{FetchRecord, ProgressReporter, SilentProgressReporter};

/// Configuration options for install
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub product: String,
    pub version: String,
    pub branch: Option<String>,
    pub include_dependencies: bool,
    pub workarea: Option<PathBuf>,
}

impl InstallOptions {
    fn request(&self) -> DiscoveryRequest<'_> {
        DiscoveryRequest {
            product: &self.product,
            version: &self.version,
            branch: self.branch.as_deref(),
            include_dependencies: self.include_dependencies,
        }
    }
}

#[derive(Debug)]
pub struct InstallOutcome {
    pub products: ProductCollection,
    pub summary: Option<InstallSummary>,
}

/// High-level install operation
pub struct InstallOperation<'a> {
    settings: &'a Settings,
    selector: Selector,
    progress: Option<Box<dyn ProgressReporter>>,
    report: Vec<FetchRecord>,
}

impl<'a> InstallOperation<'a> {
    pub fn new(settings: &'a Settings, selector: Selector) -> Self {
        Self {
            settings,
            selector,
            progress: None,
            report: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Per-product fetch results of the last execution, also after a failure
    pub fn report(&self) -> &[FetchRecord] {
        &self.report
    }

    pub fn execute(&mut self, options: &InstallOptions) -> Result<InstallOutcome> {
        let request = options.request();
        info!(
            "Installing '{}' (version '{}') into {}",
            options.product,
            options.version,
            self.settings.installer_dir.display()
        );

        let progress = self
            .progress
            .take()
            .unwrap_or_else(|| Box::new(SilentProgressReporter));
        let discovered = {
            let mut discovery = Discovery::new(
                &self.settings.installer_dir,
                &self.settings.installer_product,
                &mut self.selector,
            )
            .with_progress(progress);
            let discovered = discovery.discover(&request);
            self.report = discovery.report().to_vec();
            discovered
        };
        let products = discovered?;

        let summary = match &options.workarea {
            Some(workarea) => {
                let mut installer = WorkareaInstaller::new(self.settings, &mut self.selector);
                let installed = installer.install(&request, workarea);
                self.report.extend_from_slice(installer.fetch_report());
                Some(installed?)
            }
            None => None,
        };

        Ok(InstallOutcome { products, summary })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_fixtures::{fixture_selector, fixture_selector_with_files};
    use crate::ui::FetchStatus;
    use std::fs;
    use tempfile::TempDir;

    fn options(workarea: Option<PathBuf>) -> InstallOptions {
        InstallOptions {
            product: "kbot".to_string(),
            version: "dev".to_string(),
            branch: None,
            include_dependencies: true,
            workarea,
        }
    }

    #[test]
    fn test_install_fetches_closure() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default().with_installer_dir(Some(temp.path().join("installer")));
        let (selector, _) = fixture_selector(&[("kbot", &["kbot_core"]), ("kbot_core", &[])]);

        let mut operation = InstallOperation::new(&settings, selector);
        let outcome = operation.execute(&options(None)).unwrap();

        assert_eq!(outcome.products.names(), vec!["kbot", "kbot_core"]);
        assert!(outcome.summary.is_none());
        assert!(settings.installer_dir.join("kbot_core/description.xml").is_file());
    }

    #[test]
    fn test_second_install_reports_cached_dependencies() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default().with_installer_dir(Some(temp.path().join("installer")));
        let (selector, _) = fixture_selector(&[("kbot", &["kbot_core"]), ("kbot_core", &[])]);

        let mut operation = InstallOperation::new(&settings, selector);
        operation.execute(&options(None)).unwrap();
        operation.execute(&options(None)).unwrap();

        let statuses: Vec<_> = operation.report().iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![FetchStatus::Fetched, FetchStatus::Cached]);
    }

    #[test]
    fn test_install_into_workarea() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default().with_installer_dir(Some(temp.path().join("installer")));
        let (selector, _) = fixture_selector_with_files(
            &[("kbot", &["kbot_core"]), ("kbot_core", &[])],
            &[
                ("kbot", "pyproject.toml", "[work.link]\nbin = []\n"),
                ("kbot", "bin/tool", "#!/bin/sh\n"),
            ],
        );
        let workarea = temp.path().join("work");

        let mut operation = InstallOperation::new(&settings, selector);
        let outcome = operation.execute(&options(Some(workarea.clone()))).unwrap();
        let summary = outcome.summary.unwrap();

        assert_eq!(summary.products_processed, vec!["kbot"]);
        assert_eq!(summary.products_skipped, vec!["kbot_core"]);
        assert_eq!(summary.placements, 1);
        assert!(fs::symlink_metadata(workarea.join("bin")).unwrap().file_type().is_symlink());
        assert!(workarea.join("bin/tool").is_file());
    }

    #[test]
    fn test_root_failure_keeps_report() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::default().with_installer_dir(Some(temp.path().join("installer")));
        let (selector, _) = fixture_selector(&[]);

        let mut operation = InstallOperation::new(&settings, selector);
        assert!(operation.execute(&options(None)).is_err());
        assert_eq!(operation.report()[0].status, FetchStatus::Failed);
    }
}
