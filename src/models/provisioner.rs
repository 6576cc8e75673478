use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProvisionerType {
    Jwk,
    Oidc,
    Acme,
    X5c,
    Sshpop,
}

impl ProvisionerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerType::Jwk => "JWK",
            ProvisionerType::Oidc => "OIDC",
            ProvisionerType::Acme => "ACME",
            ProvisionerType::X5c => "X5C",
            ProvisionerType::Sshpop => "SSHPOP",
        }
    }
}

impl fmt::Display for ProvisionerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisionerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "JWK" => Ok(ProvisionerType::Jwk),
            "OIDC" => Ok(ProvisionerType::Oidc),
            "ACME" => Ok(ProvisionerType::Acme),
            "X5C" => Ok(ProvisionerType::X5c),
            "SSHPOP" => Ok(ProvisionerType::Sshpop),
            other => Err(format!("unknown provisioner type: {other}")),
        }
    }
}

/// Handle returned by the authority's name lookup. Identifies which
/// provisioner a request targets; the durable state lives in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerRef {
    pub id: String,
    pub name: String,
    pub kind: ProvisionerType,
}

/// Persisted administrative record for a provisioner. Only `id`, `name` and
/// `type` are required when reading one from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProvisionerType,
    #[serde(default = "empty_details")]
    pub details: Value,
    #[serde(default)]
    pub policy: Option<Value>,
    #[serde(default)]
    pub require_eab: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn empty_details() -> Value {
    Value::Object(Default::default())
}

impl ProvisionerRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ProvisionerType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            details: empty_details(),
            policy: None,
            require_eab: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_policy(mut self, policy: Value) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_require_eab(mut self, require_eab: bool) -> Self {
        self.require_eab = require_eab;
        self
    }

    pub fn to_ref(&self) -> ProvisionerRef {
        ProvisionerRef {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}
