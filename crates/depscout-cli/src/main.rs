//! depscout CLI entry point.
//!
//! Parses arguments, initializes logging, and dispatches the command.

use clap::Parser;
use depscout_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Analyze(analyze_args) => commands::analyze_execute(analyze_args).await,
    };

    // Library diagnostics keep their codes and help text
    result.map_err(error::cli_error_to_miette)
}
