#[cfg(test)]
pub mod memory;
pub mod vault;

use thiserror::Error;

use crate::record::{CredentialKey, CredentialMap};

/// Failures a secret store can report for a single read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no secret at this path")]
    NotFound,

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read/write access to credential maps addressed by a canonical key.
/// The reconciler talks to the store only through this trait.
pub trait SecretStore {
    fn read(&self, key: &CredentialKey) -> Result<CredentialMap>;
    fn write(&mut self, key: &CredentialKey, secrets: &CredentialMap) -> Result<()>;
}
