use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Cannot reach Vault at {address}: {detail}")]
    Connection { address: String, detail: String },

    #[error("Vault rejected the token: {0}. Check VAULT_TOKEN.")]
    Auth(String),

    #[error("Permission denied on '{path}': {detail}")]
    PermissionDenied { path: String, detail: String },

    #[error("Vault operation on '{path}' failed: {detail}")]
    Store { path: String, detail: String },

    #[error("Row {row}: missing value for '{field}'")]
    MalformedRow { row: usize, field: &'static str },

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Process exit code for this failure. Startup connectivity problems keep
    /// the historical code 2; missing configuration gets its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Config(_) => 3,
            SyncError::Connection { .. } | SyncError::Auth(_) => 2,
            _ => 1,
        }
    }
}
