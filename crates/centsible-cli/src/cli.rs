//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// weekly-suggestions - batch and serve entry point for the centsible
/// Weekly Suggester (§6.5)
#[derive(Parser)]
#[command(name = "weekly-suggestions")]
#[command(about = "Weekly cheaper-alternative suggestions for recent purchases", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to an optional centsible.toml config file (§6.6, §10.3)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Week to process (YYYY-MM-DD, must be a Monday); defaults to the most
    /// recently completed ISO week
    #[arg(long)]
    pub week: Option<String>,

    /// Process a single user instead of all users active in the week
    #[arg(long)]
    pub user: Option<String>,

    /// Run the pipeline without persisting the resulting report
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of users processed concurrently (default 10)
    #[arg(long, default_value = "0")]
    pub concurrency: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST/SSE facade (§6.2, §6.5)
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}
