use clap::Parser;
use std::path::PathBuf;

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Fetch a product and its parents:\n    workarea install kbot\n\n\
                   Fetch a release:\n    workarea install kbot -V 5.2\n\n\
                   Fetch only the product itself:\n    workarea install kbot --no-deps\n\n\
                   Try specific providers in order:\n    workarea install kbot --uses github,nexus\n\n\
                   Assemble a workarea:\n    workarea install kbot --workarea ~/work/kbot")]
pub struct InstallArgs {
    /// Product name
    pub product: String,

    /// Product version (dev, master, or a release such as 5.2)
    #[arg(long, short = 'V', default_value = "master")]
    pub version: String,

    /// Branch to fetch instead of the one derived from the version
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Do not fetch or install dependencies
    #[arg(long)]
    pub no_deps: bool,

    /// Providers to try, in order (overrides the configuration)
    #[arg(long, value_name = "PROVIDER", value_delimiter = ',')]
    pub uses: Vec<String>,

    /// Workarea directory to assemble after fetching
    #[arg(long, value_name = "DIR")]
    pub workarea: Option<PathBuf>,
}
