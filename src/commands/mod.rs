pub mod check;
pub mod init;
pub mod sync;

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::config::{self, Connection, Settings};
use crate::error::SyncError;
use crate::store::vault::VaultStore;
use crate::store::StoreError;

/// Build a Vault client from the environment and confirm the token works.
/// Every failure here is a startup failure: nothing has been read or written yet.
pub fn connect(settings: &Settings, mount: &str) -> Result<VaultStore> {
    let conn = Connection::from_env()?;
    let store = VaultStore::new(&conn, mount, settings.timeout())
        .map_err(|e| startup_error(&conn.address, e))?;
    store
        .verify_token()
        .map_err(|e| startup_error(&conn.address, e))?;
    info!(address = store.address(), mount, "connected to Vault");
    Ok(store)
}

fn startup_error(address: &str, err: StoreError) -> SyncError {
    match err {
        StoreError::Auth(detail) | StoreError::PermissionDenied(detail) => SyncError::Auth(detail),
        other => SyncError::Connection {
            address: address.to_string(),
            detail: other.to_string(),
        },
    }
}

pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let root = config::project_root()?;
    Ok(config::read(&root, config_path)?)
}
