//! In-memory admin store.
//!
//! Records live in a `HashMap` behind a `tokio::sync::RwLock`; nothing is
//! durable. The deployment mode is chosen by whoever builds the store, which
//! makes it the backend of choice for tests and throwaway dev servers.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AdminStore, BackendKind, StoreError, StoreResult};
use crate::models::ProvisionerRecord;

#[derive(Debug)]
pub struct MemoryAdminStore {
    kind: BackendKind,
    records: RwLock<HashMap<String, ProvisionerRecord>>,
}

impl MemoryAdminStore {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn standalone() -> Self {
        Self::new(BackendKind::Standalone)
    }

    pub fn linked() -> Self {
        Self::new(BackendKind::Linked)
    }

    pub fn with_records(self, records: impl IntoIterator<Item = ProvisionerRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            kind: self.kind,
            records: RwLock::new(map),
        }
    }

    /// Builds a store of `kind` from a JSON array of provisioner records.
    pub fn from_seed_file(kind: BackendKind, path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let records: Vec<ProvisionerRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("seed file {} is not a list of provisioners", path.display()))?;
        Ok(Self::new(kind).with_records(records))
    }

    pub async fn insert(&self, record: ProvisionerRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn get_provisioner(&self, id: &str) -> StoreResult<ProvisionerRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("provisioner {id}")))
    }

    async fn list_provisioners(&self) -> StoreResult<Vec<ProvisionerRecord>> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn backend_kind(&self) -> BackendKind {
        self.kind
    }
}
