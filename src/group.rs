use std::collections::BTreeMap;

use tracing::debug;

use crate::record::{Credential, CredentialKey, CredentialMap};

/// All credentials from one sheet, grouped project -> hostname -> users.
/// Keys are already canonical, so each (project, hostname) entry maps to
/// exactly one store path.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GroupedExport {
    projects: BTreeMap<String, BTreeMap<String, CredentialMap>>,
}

impl GroupedExport {
    /// Fold credentials in sheet order. A repeated (project, hostname, user)
    /// keeps the password from the later row.
    pub fn build<I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = Credential>,
    {
        let mut export = Self::default();
        for cred in credentials {
            export.insert(cred);
        }
        export
    }

    pub fn insert(&mut self, cred: Credential) {
        let users = self
            .projects
            .entry(cred.key.project().to_string())
            .or_default()
            .entry(cred.key.hostname().to_string())
            .or_default();

        if users.insert(cred.user.clone(), cred.password).is_some() {
            debug!(key = %cred.key, user = %cred.user, "later row overrides earlier password");
        }
    }

    /// Every group with its users, ordered by project then hostname.
    pub fn groups(&self) -> impl Iterator<Item = (CredentialKey, &CredentialMap)> {
        self.projects.iter().flat_map(|(project, hosts)| {
            hosts
                .iter()
                .map(move |(hostname, users)| (CredentialKey::new(project, hostname), users))
        })
    }

    pub fn group_count(&self) -> usize {
        self.projects.values().map(BTreeMap::len).sum()
    }

    pub fn credential_count(&self) -> usize {
        self.projects
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
