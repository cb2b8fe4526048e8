//! # CLI Behavior
//!
//! This is **one possible UI client** for cardsync. It is the only place that
//! knows about terminal I/O, exit codes, and output formatting.
//!
//! ## Connectivity
//!
//! The CLI treats a shared directory as the remote store. The device is
//! "online" while that directory exists and `--offline` is not given; with no
//! remote directory configured every operation works offline.
//!
//! ## Commands
//!
//! - `cardsync add --name ...`: checks for likely duplicates first and
//!   refuses to save them without `--force`.
//! - `cardsync list`: remote listing merged with local-only records, or the
//!   cache when offline.
//! - `cardsync update <id>` / `cardsync delete <id>`: exit code 2 when the
//!   change only reached the local cache.
//! - `cardsync pending`: queued creations for the owner.
//! - `cardsync sync`: drain the queue now.
//!
//! Running `cardsync` with no subcommand lists contacts.
//!
//! ## Logging
//!
//! Diagnostics from the core go to stderr through `tracing-subscriber`.
//! The level comes from `CARDSYNC_LOG` (default `warn`); `-v` forces `debug`.

mod context;
mod handlers;
mod render;
mod setup;

use anyhow::Result;
use clap::Parser;
use context::Context;
use setup::{Cli, Commands};
use tracing::Level;

pub const LOG_ENV: &str = "CARDSYNC_LOG";

fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        std::env::var(LOG_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(Level::WARN)
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        None | Some(Commands::List) => handlers::list(&ctx),
        Some(Commands::Add {
            fields,
            preview,
            force,
        }) => handlers::add(&ctx, &fields, preview, force),
        Some(Commands::Update { id, fields, clear }) => handlers::update(&ctx, &id, &fields, &clear),
        Some(Commands::Delete { id }) => handlers::delete(&ctx, &id),
        Some(Commands::Dupes { fields }) => handlers::dupes(&ctx, &fields),
        Some(Commands::Pending) => handlers::pending(&ctx),
        Some(Commands::Sync) => handlers::sync(&ctx),
    }
}
