mod cli;
mod commands;
mod config;
mod error;
mod group;
mod reconcile;
mod record;
mod sheet;
mod store;

use clap::Parser;
use cli::{Cli, Command};
use commands::sync::SyncArgs;
use error::SyncError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("VAULTSHEET_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("vaultsheet=debug")
        } else {
            EnvFilter::new("vaultsheet=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Command::Sync {
            file,
            sheet,
            mount,
            dry_run,
        } => commands::sync::run(
            config,
            SyncArgs {
                file,
                sheet,
                mount,
                dry_run,
            },
        ),
        Command::Check => commands::check::run(config),
        Command::Init => commands::init::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        let code = e.downcast_ref::<SyncError>().map_or(1, SyncError::exit_code);
        std::process::exit(code);
    }
}
