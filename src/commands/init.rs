use anyhow::{bail, Context, Result};

use crate::config::{self, Settings};

pub fn run() -> Result<()> {
    let root = config::project_root()?;
    let path = root.join(config::CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Edit it, or delete it to start over.",
            path.display()
        );
    }

    let written = config::write(&root, &Settings::default()).context("Failed to write settings")?;

    println!("Wrote {}.", written.display());
    println!();
    println!("  1. Export credentials:  export VAULT_ADDR=... VAULT_TOKEN=...");
    println!("  2. Check access:        vaultsheet check");
    println!("  3. Preview the sync:    vaultsheet sync --dry-run");
    println!("  4. Run it:              vaultsheet sync");

    Ok(())
}
