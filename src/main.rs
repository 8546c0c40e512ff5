//! scriptpack - Bundle and archive compiled scripts for deployment

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scriptpack::Result;
use scriptpack::app::AppContext;
use scriptpack::cli::Cli;
use scriptpack::cli::output::{emit_robot, robot_error};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                // Robot mode: structured error on stdout
                if emit_robot(&robot_error(&e)).is_err() {
                    println!("{{\"error\":true}}");
                }
            } else {
                eprintln!("Error: {e}");
                eprintln!("  hint: {}", e.code().suggestion());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::from_cli(cli)?;
    scriptpack::cli::commands::run(&ctx, &cli.command).await
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,scriptpack=info",
        1 => "info,scriptpack=debug",
        2 => "debug,scriptpack=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
