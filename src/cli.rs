use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vaultsheet",
    about = "Push credentials from a spreadsheet into Vault, merging with what is already there.",
    version
)]
pub struct Cli {
    /// Settings file (defaults to ./vaultsheet.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the spreadsheet and merge every project/host group into Vault.
    Sync {
        /// Spreadsheet to read (.xlsx, .xls or .ods).
        file: Option<PathBuf>,

        /// Worksheet holding the project/hostname/user/password table.
        #[arg(long)]
        sheet: Option<String>,

        /// KV v2 mount to write under.
        #[arg(long)]
        mount: Option<String>,

        /// Show the paths that would be written without contacting Vault.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that VAULT_ADDR and VAULT_TOKEN are set and the token is accepted.
    Check,

    /// Write a vaultsheet.toml with default settings in the current directory.
    Init,
}
