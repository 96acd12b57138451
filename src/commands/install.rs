//! Install command implementation

use tracing::debug;

use super::{GlobalOptions, selector};
use crate::cli::InstallArgs;
use crate::error::Result;
use crate::operations::{InstallOperation, InstallOptions};
use crate::ui::{progress_for_stderr, render_fetch_report, render_install_summary};

/// Run install command
pub fn run(global: &GlobalOptions, args: InstallArgs) -> Result<()> {
    let providers = (!args.uses.is_empty()).then(|| args.uses.clone());
    let settings = global.settings(providers)?;
    debug!("Provider order: {}", settings.providers.join(", "));

    let options = InstallOptions {
        product: args.product,
        version: args.version,
        branch: args.branch,
        include_dependencies: !args.no_deps,
        workarea: args.workarea,
    };

    let mut operation =
        InstallOperation::new(&settings, selector(&settings)).with_progress(progress_for_stderr());
    let result = operation.execute(&options);

    let report = render_fetch_report(operation.report());
    if !report.is_empty() {
        print!("{report}");
    }
    let outcome = result?;

    println!(
        "Installed {} product(s) into {}",
        outcome.products.len(),
        settings.installer_dir.display()
    );
    if let Some(summary) = outcome.summary {
        print!("{}", render_install_summary(&summary));
    }
    Ok(())
}
