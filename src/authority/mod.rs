//! Authority facade.
//!
//! The admission pipeline never verifies tokens or walks the provisioner
//! collection itself; it asks an [`Authority`]. Implementations must be safe
//! to call from many in-flight requests at once.

mod token;

pub use token::TokenAuthority;

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::errors::AdminResult;
use crate::models::{AdminIdentity, ProvisionerRef};

#[async_trait]
pub trait Authority: Send + Sync {
    /// Whether the administrative API is switched on. Read on every request.
    fn is_admin_api_enabled(&self) -> bool;

    /// Verifies an admin bearer token. The returned error is already
    /// categorized and is surfaced to the caller as-is.
    async fn authorize_admin_token(&self, parts: &Parts, token: &str) -> AdminResult<AdminIdentity>;

    async fn load_provisioner_by_name(&self, name: &str) -> anyhow::Result<ProvisionerRef>;
}
