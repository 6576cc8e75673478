//! Admin store facade.
//!
//! The admission pipeline reads provisioner records through [`AdminStore`] and
//! asks it which deployment mode it serves. Backends fix their
//! [`BackendKind`] when they are constructed; callers still query it on every
//! request instead of caching the answer.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProvisionerRecord;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryAdminStore;
pub use sqlite::SqliteAdminStore;

/// Deployment mode a backend can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local administrative state, no management plane behind it.
    Standalone,
    /// State synchronized with a central management plane.
    Linked,
    /// Any other backend. Admin routes are not served on it.
    Unsupported,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Standalone => "standalone",
            BackendKind::Linked => "linked",
            BackendKind::Unsupported => "unsupported",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standalone" => Ok(BackendKind::Standalone),
            "linked" => Ok(BackendKind::Linked),
            "unsupported" => Ok(BackendKind::Unsupported),
            other => Err(format!("unknown backend kind: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn get_provisioner(&self, id: &str) -> StoreResult<ProvisionerRecord>;

    async fn list_provisioners(&self) -> StoreResult<Vec<ProvisionerRecord>>;

    fn backend_kind(&self) -> BackendKind;

    fn supports_linked_mode(&self) -> bool {
        self.backend_kind() == BackendKind::Linked
    }
}
