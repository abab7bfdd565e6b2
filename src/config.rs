use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const CONFIG_FILE: &str = "vaultsheet.toml";

const ADDR_VAR: &str = "VAULT_ADDR";
const TOKEN_VAR: &str = "VAULT_TOKEN";
const NAMESPACE_VAR: &str = "VAULT_NAMESPACE";

/// Run settings, read from `vaultsheet.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// KV v2 mount the secrets live under.
    pub mount: String,
    /// Worksheet holding the credential table.
    pub sheet: String,
    /// Spreadsheet to read when none is given on the command line.
    pub file: PathBuf,
    /// Per-request timeout for Vault calls. Must be at least 1.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mount: "dba".into(),
            sheet: "passwords".into(),
            file: PathBuf::from("passwords.xlsx"),
            timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vault connection parameters. These come only from the environment.
#[derive(Debug, Clone)]
pub struct Connection {
    pub address: String,
    pub token: SecretString,
    pub namespace: Option<String>,
}

impl Connection {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SyncError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let address = get(ADDR_VAR);
        let token = get(TOKEN_VAR);
        let (address, token) = match (address, token) {
            (Some(a), Some(t)) => (a, t),
            (a, t) => {
                let missing: Vec<&str> = [(ADDR_VAR, a.is_none()), (TOKEN_VAR, t.is_none())]
                    .iter()
                    .filter(|(_, absent)| *absent)
                    .map(|(name, _)| *name)
                    .collect();
                return Err(SyncError::Config(format!(
                    "{} not set. Export VAULT_ADDR and VAULT_TOKEN before running.",
                    missing.join(" and ")
                )));
            }
        };

        Ok(Self {
            address: address.trim().to_string(),
            token: SecretString::new(token),
            namespace: get(NAMESPACE_VAR),
        })
    }
}

/// Load settings. `explicit` is a path given with `--config`; it must exist.
/// Without it, `vaultsheet.toml` in `root` is used when present and defaults
/// otherwise.
pub fn read(root: &Path, explicit: Option<&Path>) -> Result<Settings, SyncError> {
    let path = match explicit {
        Some(p) if !p.exists() => {
            return Err(SyncError::Config(format!(
                "Config file not found: {}",
                p.display()
            )))
        }
        Some(p) => p.to_path_buf(),
        None => {
            let p = root.join(CONFIG_FILE);
            if !p.exists() {
                return Ok(Settings::default());
            }
            p
        }
    };

    let raw = std::fs::read_to_string(&path)?;
    let settings: Settings = toml::from_str(&raw)
        .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;

    if settings.timeout_secs == 0 {
        return Err(SyncError::Config(format!(
            "{}: timeout_secs must be at least 1",
            path.display()
        )));
    }
    Ok(settings)
}

/// Write settings to `vaultsheet.toml` in `root`.
pub fn write(root: &Path, settings: &Settings) -> Result<PathBuf, SyncError> {
    let path = root.join(CONFIG_FILE);
    let raw = toml::to_string(settings).map_err(|e| SyncError::Config(e.to_string()))?;
    std::fs::write(&path, raw)?;
    Ok(path)
}

/// Returns the current project root (cwd).
pub fn project_root() -> Result<PathBuf, SyncError> {
    std::env::current_dir().map_err(SyncError::Io)
}
