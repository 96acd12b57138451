use clap::Parser;

/// Arguments for the list command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List installed products:\n    workarea list\n\n\
                  Show dependency trees:\n    workarea list --tree")]
pub struct ListArgs {
    /// Render one dependency tree per root product
    #[arg(long)]
    pub tree: bool,
}
