mod common;
mod completions;
mod reel;
mod ui;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use crate::completions::{SupportedShell, print_completions};
use crate::reel::ReelCommands;
use crate::ui::prelude::{Level, OutputFormat, emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Text,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(value: OutputArg) -> Self {
        match value {
            OutputArg::Text => OutputFormat::Text,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

/// Shortsmith: captioned short-form videos from narration and a background clip
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for status events
    #[arg(long, value_enum, default_value_t = OutputArg::Text, global = true)]
    output: OutputArg,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Reel(ReelCommands),

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: SupportedShell,
    },
}

fn main() {
    let cli = Cli::parse();

    let format = OutputFormat::from(cli.output);
    ui::init(format, !cli.no_color && format == OutputFormat::Text);
    ui::set_debug_mode(cli.debug);

    let result = match cli.command {
        Commands::Reel(command) => reel::handle_reel_command(command),
        Commands::Completions { shell } => {
            print_completions(shell, Cli::command());
            Ok(())
        }
    };

    if let Err(err) = result {
        emit(Level::Error, "error", &format!("Error: {err:#}"), None);
        std::process::exit(1);
    }
}
