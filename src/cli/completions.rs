use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    workarea completions bash > ~/.bash_completion.d/workarea\n\n\
                  Generate zsh completions:\n    workarea completions zsh > ~/.zfunc/_workarea\n\n\
                  Generate fish completions:\n    workarea completions fish > ~/.config/fish/completions/workarea.fish\n\n\
                  Generate PowerShell completions:\n    workarea completions powershell")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
