use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::http::request::Parts;
use tokio::sync::RwLock;

use super::Authority;
use crate::errors::{AdminError, AdminResult};
use crate::jwt::TokenConfig;
use crate::models::{AdminIdentity, ProvisionerRef};
use crate::store::AdminStore;

/// Authority backed by HS256 admin tokens and an in-memory provisioner
/// directory keyed by name.
#[derive(Debug)]
pub struct TokenAuthority {
    tokens: TokenConfig,
    admin_api_enabled: AtomicBool,
    provisioners: RwLock<HashMap<String, ProvisionerRef>>,
}

impl TokenAuthority {
    pub fn new(tokens: TokenConfig, admin_api_enabled: bool) -> Self {
        Self {
            tokens,
            admin_api_enabled: AtomicBool::new(admin_api_enabled),
            provisioners: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_admin_api_enabled(&self, enabled: bool) {
        self.admin_api_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Replaces the provisioner directory with the store's current contents.
    pub async fn load_provisioners(&self, store: &dyn AdminStore) -> anyhow::Result<usize> {
        let records = store.list_provisioners().await?;
        let directory: HashMap<_, _> = records
            .iter()
            .map(|r| (r.name.clone(), r.to_ref()))
            .collect();
        let count = directory.len();

        *self.provisioners.write().await = directory;
        tracing::info!(count, "loaded provisioner directory");

        Ok(count)
    }

    pub async fn register_provisioner(&self, provisioner: ProvisionerRef) {
        self.provisioners
            .write()
            .await
            .insert(provisioner.name.clone(), provisioner);
    }
}

#[async_trait]
impl Authority for TokenAuthority {
    fn is_admin_api_enabled(&self) -> bool {
        self.admin_api_enabled.load(Ordering::SeqCst)
    }

    async fn authorize_admin_token(&self, _parts: &Parts, token: &str) -> AdminResult<AdminIdentity> {
        let raw = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let claims = self.tokens.decode(raw).map_err(|err| {
            AdminError::unauthorized(format!("error validating authorization token: {err}"))
        })?;

        Ok(claims.into())
    }

    async fn load_provisioner_by_name(&self, name: &str) -> anyhow::Result<ProvisionerRef> {
        self.provisioners
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("provisioner {name} not found"))
    }
}
