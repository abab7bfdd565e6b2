use std::cell::RefCell;
use std::collections::HashMap;

use crate::record::{CredentialKey, CredentialMap};
use crate::store::{Result, SecretStore, StoreError};

/// In-memory store used by reconciler tests. Records every call and can be
/// told to fail reads or writes for a given path.
#[derive(Default)]
pub struct MemoryStore {
    secrets: HashMap<String, CredentialMap>,
    fail_read: HashMap<String, fn() -> StoreError>,
    fail_write: HashMap<String, fn() -> StoreError>,
    reads: RefCell<Vec<String>>,
    writes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, path: &str, pairs: &[(&str, &str)]) {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.secrets.insert(path.to_string(), map);
    }

    pub fn fail_read_at(&mut self, path: &str, err: fn() -> StoreError) {
        self.fail_read.insert(path.to_string(), err);
    }

    pub fn fail_write_at(&mut self, path: &str, err: fn() -> StoreError) {
        self.fail_write.insert(path.to_string(), err);
    }

    pub fn get(&self, path: &str) -> Option<&CredentialMap> {
        self.secrets.get(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.secrets.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.borrow().clone()
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl SecretStore for MemoryStore {
    fn read(&self, key: &CredentialKey) -> Result<CredentialMap> {
        let path = key.path();
        self.reads.borrow_mut().push(path.clone());
        if let Some(err) = self.fail_read.get(&path) {
            return Err(err());
        }
        self.secrets.get(&path).cloned().ok_or(StoreError::NotFound)
    }

    fn write(&mut self, key: &CredentialKey, secrets: &CredentialMap) -> Result<()> {
        let path = key.path();
        if let Some(err) = self.fail_write.get(&path) {
            return Err(err());
        }
        self.writes.push(path.clone());
        self.secrets.insert(path, secrets.clone());
        Ok(())
    }
}
