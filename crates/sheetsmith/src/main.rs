//! Entry point wiring: parses the CLI, initialises tracing, and dispatches to
//! the export run or one of the utility subcommands in `run.rs`.
mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Plan { count }) => run::run_plan(count),
        Some(Command::Inspect(args)) => run::run_inspect(args),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Where => run::run_config_where(),
        },
        None => run::run(cli.run),
    }
}
