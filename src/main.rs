// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process::ExitCode;

use clap::Parser;
use pose_measure::cli::args::{Cli, Commands};
use pose_measure::cli::logging::init_tracing;
use pose_measure::cli::{measure, serve};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Serve(args) => serve::run(args),
        Commands::Measure(args) => measure::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            pose_measure::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
