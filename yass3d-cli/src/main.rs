use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;
use yass3d_cli::{init_logging, run, Cli};

/// Exit status for a malformed command line (-1)
const USAGE_ERROR: u8 = 255;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(USAGE_ERROR),
            };
        }
    };

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
