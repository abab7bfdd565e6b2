use std::collections::BTreeMap;
use std::fmt;

use crate::error::SyncError;

/// Username -> password for one (project, hostname) pair.
pub type CredentialMap = BTreeMap<String, String>;

/// One spreadsheet data row after forward-filling. Fields that were blank
/// (and could not be filled) are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the sheet, header included.
    pub line: usize,
    pub project: Option<String>,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Canonical (project, hostname) pair. Project is upper-cased, hostname is
/// lower-cased; both reads and writes go through this type so they always
/// land on the same store path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CredentialKey {
    project: String,
    hostname: String,
}

impl CredentialKey {
    pub fn new(project: &str, hostname: &str) -> Self {
        Self {
            project: project.trim().to_uppercase(),
            hostname: hostname.trim().to_lowercase(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Path of this key below the secrets mount.
    pub fn path(&self) -> String {
        format!("{}/{}", self.project, self.hostname)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.hostname)
    }
}

/// A normalized row: canonical key plus one user/password pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub key: CredentialKey,
    pub user: String,
    pub password: String,
}

/// Turn a raw row into a `Credential`, canonicalizing the key up front so
/// rows that differ only by case group together.
pub fn normalize(row: RawRow) -> Result<Credential, SyncError> {
    let project = required(row.project, row.line, "project")?;
    let hostname = required(row.hostname, row.line, "hostname")?;
    let user = required(row.user, row.line, "user")?;
    let password = required(row.password, row.line, "password")?;

    Ok(Credential {
        key: CredentialKey::new(&project, &hostname),
        user,
        password,
    })
}

/// Normalize every row, stopping at the first malformed one.
pub fn normalize_all(rows: Vec<RawRow>) -> Result<Vec<Credential>, SyncError> {
    rows.into_iter().map(normalize).collect()
}

fn required(value: Option<String>, row: usize, field: &'static str) -> Result<String, SyncError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SyncError::MalformedRow { row, field }),
    }
}
