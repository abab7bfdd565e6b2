use std::path::Path;

use anyhow::Result;

use crate::commands;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let settings = commands::load_settings(config_path)?;
    let store = commands::connect(&settings, &settings.mount)?;
    println!(
        "Vault at {} accepted the token. Secrets go under mount '{}'.",
        store.address(),
        settings.mount
    );
    Ok(())
}
