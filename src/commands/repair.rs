//! Repair command implementation

use console::Style;

use super::{GlobalOptions, selector};
use crate::cli::RepairArgs;
use crate::error::Result;
use crate::operations::RepairOperation;

/// Run repair command
pub fn run(global: &GlobalOptions, args: RepairArgs) -> Result<()> {
    let settings = global.settings(None)?;
    let mut operation = RepairOperation::new(&settings, selector(&settings));
    let repaired = operation.execute(&args.product, args.version.as_deref())?;

    if repaired.is_empty() {
        println!("Nothing to repair.");
        return Ok(());
    }
    println!("{}", Style::new().bold().apply_to("Repaired products:"));
    for name in &repaired {
        println!("  - {}", Style::new().yellow().apply_to(name));
    }
    Ok(())
}
