use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::store::BackendKind;

/// Which admin store backs the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Sqlite { database_url: String },
    /// Non-durable store. `kind` comes from `ADMIN_STORE_MODE`, records from
    /// the optional JSON file named by `ADMIN_STORE_SEED`.
    Memory { kind: BackendKind, seed: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub admin_api_enabled: bool,
    pub token_secret: String,
    pub token_exp_minutes: i64,
    pub store: StoreSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        let admin_api_enabled = match std::env::var("ADMIN_API_ENABLED") {
            Ok(value) => parse_bool(&value).context("ADMIN_API_ENABLED must be a boolean")?,
            Err(_) => false,
        };

        let token_secret =
            std::env::var("ADMIN_TOKEN_SECRET").context("ADMIN_TOKEN_SECRET not set")?;

        let token_exp_minutes = token_exp_minutes(std::env::var("ADMIN_TOKEN_EXP_MINUTES").ok())?;

        let store = match std::env::var("ADMIN_STORE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StoreSettings::Sqlite {
                database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            },
            "memory" => StoreSettings::Memory {
                kind: memory_store_kind(std::env::var("ADMIN_STORE_MODE").ok())?,
                seed: std::env::var("ADMIN_STORE_SEED").ok().map(PathBuf::from),
            },
            other => bail!("unknown ADMIN_STORE backend: {other}"),
        };

        Ok(Self {
            port,
            admin_api_enabled,
            token_secret,
            token_exp_minutes,
            store,
        })
    }
}

/// Longest admin token lifetime accepted from the environment: one week.
pub const MAX_TOKEN_EXP_MINUTES: i64 = 7 * 24 * 60;

/// Reads `ADMIN_TOKEN_EXP_MINUTES`. Unset means 60; anything else must be a
/// whole number of minutes in `1..=MAX_TOKEN_EXP_MINUTES`.
pub fn token_exp_minutes(raw: Option<String>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(60);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .context("ADMIN_TOKEN_EXP_MINUTES must be a valid integer")?;
    if !(1..=MAX_TOKEN_EXP_MINUTES).contains(&minutes) {
        bail!("ADMIN_TOKEN_EXP_MINUTES must be between 1 and {MAX_TOKEN_EXP_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

/// Reads `ADMIN_STORE_MODE` for the memory store. Unset means standalone.
pub fn memory_store_kind(raw: Option<String>) -> anyhow::Result<BackendKind> {
    match raw {
        None => Ok(BackendKind::Standalone),
        Some(raw) => raw
            .parse::<BackendKind>()
            .map_err(anyhow::Error::msg)
            .context("ADMIN_STORE_MODE must be standalone, linked or unsupported"),
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("invalid boolean: {other}"),
    }
}
