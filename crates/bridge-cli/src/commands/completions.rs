//! Shell completions generation.

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use super::{Cli, CompletionsArgs, ShellType};

impl From<ShellType> for Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Self::Bash,
            ShellType::Zsh => Self::Zsh,
            ShellType::Fish => Self::Fish,
            ShellType::PowerShell => Self::PowerShell,
            ShellType::Elvish => Self::Elvish,
        }
    }
}

/// Run the completions command.
pub fn run(args: CompletionsArgs) {
    generate_completions(args.shell, &mut io::stdout());
}

fn generate_completions(shell: ShellType, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(Shell::from(shell), &mut cmd, "bridge", out);
}
