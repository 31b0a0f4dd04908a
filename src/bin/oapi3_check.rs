use std::process::ExitCode;

use clap::Parser;
use oapi3::cli::{init_logging, run_cli, Cli, Outcome};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;
    let outcome = run_cli(&cli, &mut std::io::stdout().lock())?;
    Ok(match outcome {
        Outcome::Valid => ExitCode::SUCCESS,
        Outcome::Rejected => ExitCode::FAILURE,
    })
}
