use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::Admitted;
use crate::errors::AdminError;
use crate::models::{AdminIdentity, ProvisionerRecord};

/// The admin that passed authentication for this request.
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub AdminIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Admitted>()
            .map(|admitted| CurrentAdmin(admitted.admin().clone()))
            .ok_or_else(|| AdminError::internal("request was not admitted"))
    }
}

/// The provisioner resolved from the route's path.
#[derive(Debug, Clone)]
pub struct CurrentProvisioner(pub ProvisionerRecord);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentProvisioner
where
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admitted = parts
            .extensions
            .get::<Admitted>()
            .ok_or_else(|| AdminError::internal("request was not admitted"))?;

        admitted
            .provisioner()
            .cloned()
            .map(CurrentProvisioner)
            .ok_or_else(|| AdminError::internal("provisioner not loaded for this route"))
    }
}
