//! exo-search - hybrid marketplace listing search

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use exo_search::Result;
use exo_search::app::AppContext;
use exo_search::cli::output::{emit_robot, robot_error};
use exo_search::cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                // Robot mode: JSON error output to stdout
                if emit_robot(&robot_error(&e)).is_err() {
                    eprintln!("Error: {e}");
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    tracing::debug!(
        db = %ctx.db_path.display(),
        command = command_name(&cli.command),
        "running command"
    );
    exo_search::cli::commands::run(&ctx, &cli.command)
}

const fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Search(_) => "search",
        Commands::Stats(_) => "stats",
        Commands::Preload(_) => "preload",
        Commands::Config(_) => "config",
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn,exo_search=info",
            1 => "info,exo_search=debug",
            2 => "debug,exo_search=trace",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        // JSON logging for robot mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Human-readable logging
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
