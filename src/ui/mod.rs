//! Presentation layer
//!
//! - [`ProgressReporter`]: progress while products are fetched, either an
//!   indicatif spinner on a terminal or nothing at all
//! - [`report`]: the fetch report and installation summary tables

pub mod report;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use report::{FetchRecord, FetchStatus, render_fetch_report, render_install_summary};

/// Progress reporting for the fetch phase
pub trait ProgressReporter {
    /// A product fetch is starting
    fn start_product(&mut self, name: &str, position: usize);

    /// Discovery is done
    fn finish(&mut self);
}

/// Spinner on stderr
pub struct SpinnerProgressReporter {
    spinner: ProgressBar,
}

impl SpinnerProgressReporter {
    pub fn new() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner }
    }
}

impl ProgressReporter for SpinnerProgressReporter {
    fn start_product(&mut self, name: &str, position: usize) {
        self.spinner.set_message(format!("({position}) fetching {name}"));
    }

    fn finish(&mut self) {
        self.spinner.finish_and_clear();
    }
}

/// No-op reporter for non-interactive runs and tests
#[derive(Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_product(&mut self, _name: &str, _position: usize) {}

    fn finish(&mut self) {}
}

/// Spinner when stderr is a terminal, silence otherwise
pub fn progress_for_stderr() -> Box<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Box::new(SpinnerProgressReporter::new())
    } else {
        Box::new(SilentProgressReporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_reporter_no_ops() {
        let mut reporter = SilentProgressReporter;
        reporter.start_product("kbot", 1);
        reporter.finish();
    }

    #[test]
    fn test_spinner_message() {
        let mut reporter = SpinnerProgressReporter::new();
        reporter.start_product("kbot", 2);
        assert_eq!(reporter.spinner.message(), "(2) fetching kbot");
        reporter.finish();
        assert!(reporter.spinner.is_finished());
    }
}
