use std::fmt;
use std::io;

use clap::{Command, ValueEnum};
use clap_complete::Shell;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SupportedShell {
    Bash,
    Zsh,
    Fish,
}

impl SupportedShell {
    fn as_complete_shell(self) -> Shell {
        match self {
            SupportedShell::Bash => Shell::Bash,
            SupportedShell::Zsh => Shell::Zsh,
            SupportedShell::Fish => Shell::Fish,
        }
    }
}

impl fmt::Display for SupportedShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportedShell::Bash => write!(f, "bash"),
            SupportedShell::Zsh => write!(f, "zsh"),
            SupportedShell::Fish => write!(f, "fish"),
        }
    }
}

/// Writes the completion script for `shell` to stdout.
pub fn print_completions(shell: SupportedShell, mut command: Command) {
    let name = command.get_name().to_string();
    clap_complete::generate(
        shell.as_complete_shell(),
        &mut command,
        name,
        &mut io::stdout(),
    );
}
