//! # repokeep
//!
//! **repokeep** keeps local mirrors of a set of git repositories.
//!
//! Features:
//! - Track repositories listed one per line in `$TARGET/repos.conf`
//! - `repokeep run` clones or pulls every tracked repository once
//! - `repokeep daemon` repeats that cycle every day at local midnight
//! - `repokeep discover` adds a GitHub organization's repositories to `repos.conf`
//! - `repokeep status` shows the persisted state of every tracked repository
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use repokeep::{cmd_daemon, cmd_discover, cmd_run, cmd_status};
use tracing_subscriber::EnvFilter;

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "repokeep",
    version,
    about = "repokeep - daily git repository mirroring",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

/// Available subcommands.
///
/// Each variant corresponds to a subcommand of `repokeep`.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run one backup cycle now
    Run {
        /// Drop state records for repositories no longer in repos.conf
        #[arg(long)]
        prune: bool,
    },
    /// Run a backup cycle every day at local midnight
    Daemon {
        /// Drop state records for repositories no longer in repos.conf
        #[arg(long)]
        prune: bool,
    },
    /// Add a GitHub organization's repositories to repos.conf
    Discover {
        /// Print what would be added without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the persisted state of every tracked repository
    Status,
}

/// CLI entry point.
///
/// Parses arguments with `clap` and executes the selected subcommand.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cmd = cli.cmd.unwrap();

    match cmd {
        Cmd::Run { prune } => cmd_run(prune),
        Cmd::Daemon { prune } => cmd_daemon(prune),
        Cmd::Discover { dry_run } => cmd_discover(dry_run),
        Cmd::Status => cmd_status(),
    }
}
