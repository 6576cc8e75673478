//! Terminal handlers for provisioner-scoped admin routes. They run only after
//! admission and read the identity and record from request context.

use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::admission::{CurrentAdmin, CurrentProvisioner};
use crate::models::ProvisionerRecord;

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub provisioner: String,
    pub policy: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct EabResponse {
    pub provisioner: String,
    pub require_eab: bool,
}

pub async fn get_provisioner(
    CurrentAdmin(admin): CurrentAdmin,
    CurrentProvisioner(provisioner): CurrentProvisioner,
) -> Json<ProvisionerRecord> {
    tracing::info!(admin_id = %admin.id, provisioner = %provisioner.name, "provisioner read");
    Json(provisioner)
}

pub async fn get_provisioner_policy(
    CurrentProvisioner(provisioner): CurrentProvisioner,
) -> Json<PolicyResponse> {
    Json(PolicyResponse {
        provisioner: provisioner.name,
        policy: provisioner.policy,
    })
}

pub async fn get_eab_requirement(
    CurrentProvisioner(provisioner): CurrentProvisioner,
) -> Json<EabResponse> {
    Json(EabResponse {
        provisioner: provisioner.name,
        require_eab: provisioner.require_eab,
    })
}
