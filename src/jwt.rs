use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::{AdminIdentity, AdminScope};

/// Signing material and lifetime for admin bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_minutes: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_minutes: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_minutes,
        }
    }

    /// Signs a token for `admin`. A lifetime that overflows the clock is an
    /// error, not a panic.
    pub fn encode(&self, admin: &AdminIdentity) -> anyhow::Result<String> {
        use anyhow::Context;
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = Duration::try_minutes(self.exp_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .with_context(|| format!("token lifetime of {} minutes is out of range", self.exp_minutes))?;

        let claims = Claims {
            sub: admin.id,
            name: admin.subject.clone(),
            scope: admin.scope,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))?;
        Ok(token)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    #[serde(default)]
    pub scope: AdminScope,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for AdminIdentity {
    fn from(claims: Claims) -> Self {
        AdminIdentity::new(claims.sub, claims.name, claims.scope)
    }
}
