//! weekly-suggestions CLI
//!
//! Usage:
//!   weekly-suggestions [--week YYYY-MM-DD] [--user USER_ID] [--dry-run] [--concurrency N]
//!   weekly-suggestions serve [--host HOST] [--port PORT]

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use centsible_core::Config;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Some(Commands::Serve { host, port }) => match commands::cmd_serve(config, &host, port).await
        {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("server error: {e:#}");
                ExitCode::FAILURE
            }
        },
        None => {
            let concurrency = if cli.concurrency == 0 {
                config.concurrency_users
            } else {
                cli.concurrency
            };
            match commands::cmd_batch(&config, cli.week.as_deref(), cli.user, cli.dry_run, concurrency)
                .await
            {
                Ok(code) => ExitCode::from(code as u8),
                Err(e) => {
                    eprintln!("batch run failed: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
