use tracing::{debug, info};

use crate::error::SyncError;
use crate::group::GroupedExport;
use crate::record::{CredentialKey, CredentialMap};
use crate::store::{SecretStore, StoreError};

/// Tally of what a sync did to the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub groups: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Users that exist only remotely and were carried over untouched.
    pub preserved: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: &MergeOutcome) {
        self.groups += 1;
        self.added += outcome.added;
        self.updated += outcome.updated;
        self.unchanged += outcome.unchanged;
        self.preserved += outcome.preserved;
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct MergeOutcome {
    added: usize,
    updated: usize,
    unchanged: usize,
    preserved: usize,
}

/// Overlay `local` onto `remote`. Local passwords win; users only present
/// remotely are kept.
fn merge(mut remote: CredentialMap, local: &CredentialMap) -> (CredentialMap, MergeOutcome) {
    let mut outcome = MergeOutcome {
        preserved: remote.keys().filter(|u| !local.contains_key(*u)).count(),
        ..Default::default()
    };

    for (user, password) in local {
        match remote.insert(user.clone(), password.clone()) {
            None => outcome.added += 1,
            Some(old) if old == *password => outcome.unchanged += 1,
            Some(_) => outcome.updated += 1,
        }
    }

    (remote, outcome)
}

/// Applies a grouped export to a store, one read-merge-write per group.
pub struct Reconciler<'a, S: SecretStore> {
    store: &'a mut S,
    mount: &'a str,
}

impl<'a, S: SecretStore> Reconciler<'a, S> {
    pub fn new(store: &'a mut S, mount: &'a str) -> Self {
        Self { store, mount }
    }

    /// Sync every group in order. The first store failure stops the run;
    /// groups written before it stay written.
    pub fn run(&mut self, export: &GroupedExport) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        for (key, local) in export.groups() {
            let outcome = self.sync_group(&key, local)?;
            report.record(&outcome);
        }
        Ok(report)
    }

    fn sync_group(&mut self, key: &CredentialKey, local: &CredentialMap) -> Result<MergeOutcome, SyncError> {
        let remote = match self.store.read(key) {
            Ok(map) => map,
            Err(StoreError::NotFound) => {
                debug!(%key, "no existing secret, starting empty");
                CredentialMap::new()
            }
            Err(e) => return Err(self.fail(key, e)),
        };

        let (merged, outcome) = merge(remote, local);

        // Always written, even when nothing changed.
        self.store.write(key, &merged).map_err(|e| self.fail(key, e))?;

        info!(
            path = %self.full_path(key),
            added = outcome.added,
            updated = outcome.updated,
            kept = outcome.preserved,
            "synced"
        );
        Ok(outcome)
    }

    fn full_path(&self, key: &CredentialKey) -> String {
        format!("{}/{}", self.mount, key.path())
    }

    fn fail(&self, key: &CredentialKey, err: StoreError) -> SyncError {
        let path = self.full_path(key);
        match err {
            StoreError::PermissionDenied(detail) => SyncError::PermissionDenied { path, detail },
            other => SyncError::Store {
                path,
                detail: other.to_string(),
            },
        }
    }
}
