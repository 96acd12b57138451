//! List command implementation

use super::GlobalOptions;
use crate::cli::ListArgs;
use crate::error::Result;
use crate::operations::{ListOperation, ListOptions};

/// Run list command
pub fn run(global: &GlobalOptions, args: ListArgs) -> Result<()> {
    let settings = global.settings(None)?;
    let output = ListOperation::new(&settings.installer_dir).execute(ListOptions { tree: args.tree })?;
    println!("{output}");
    Ok(())
}
