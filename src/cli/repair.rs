use clap::Parser;

/// Arguments for the repair command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Repair a product closure on master:\n    workarea repair kbot\n\n\
                  Repair and switch to a release:\n    workarea repair kbot -V 5.2")]
pub struct RepairArgs {
    /// Product whose closure should be kept
    pub product: String,

    /// Version the closure should be on; branches are only checked when given
    #[arg(long, short = 'V')]
    pub version: Option<String>,
}
