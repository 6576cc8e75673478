use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission scope carried by an admin token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminScope {
    #[default]
    Admin,
    SuperAdmin,
}

impl AdminScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminScope::Admin => "admin",
            AdminScope::SuperAdmin => "super_admin",
        }
    }
}

/// The authenticated caller of an administrative request. Lives for a single
/// request and is never mutated after the authority hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub subject: String,
    pub scope: AdminScope,
}

impl AdminIdentity {
    pub fn new(id: Uuid, subject: impl Into<String>, scope: AdminScope) -> Self {
        Self {
            id,
            subject: subject.into(),
            scope,
        }
    }
}
