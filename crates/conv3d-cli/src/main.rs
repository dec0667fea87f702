//! conv3d-plan: block-dimension decisions for 3-D convolutions from the
//! command line.

use anyhow::{Result, anyhow};
use clap::Parser;
use conv3d_cli::exit::{EXIT_GENERIC_FAIL, EXIT_SUCCESS};
use conv3d_cli::{Cli, Commands, LogFormat, exit_code, run_decide, run_platform};
use std::io::Write;
use tracing::debug;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(EXIT_GENERIC_FAIL);
    }

    let result = {
        let mut stdout = std::io::stdout().lock();
        let result = match &cli.command {
            Commands::Decide(args) => run_decide(args, &mut stdout),
            Commands::Platform(args) => run_platform(args, &mut stdout),
        };
        result.and_then(|()| stdout.flush().map_err(Into::into))
    };

    let code = match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            for cause in e.chain().skip(1) {
                debug!("  Caused by: {}", cause);
            }
            eprintln!("error: {e:#}");
            exit_code(&e)
        }
    };
    std::process::exit(code);
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
fn setup_logging(cli: &Cli) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Pretty => subscriber.pretty().try_init(),
    }
    .map_err(|e| anyhow!(e))
}
