use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tplvars_conf::Settings;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::TplvarsCommand;
use crate::logging;

/// The main CLI structure that defines the command-line interface
#[derive(Parser)]
#[command(name = "tplvars")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: TplvarsCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let project_root = std::env::current_dir().context("Failed to get current directory")?;
    let settings = Settings::new(&project_root).context("Failed to load settings")?;
    logging::init_tracing(&cli.args.global, settings.debug);

    let exit = cli.command.execute(&cli.args, &settings)?;
    Ok(exit.report(&cli.args.global))
}
