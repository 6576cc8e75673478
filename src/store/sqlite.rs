//! SQLite-backed admin store. This is the standalone backend: the authority
//! owns its administrative state locally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{AdminStore, BackendKind, StoreError, StoreResult};
use crate::models::{ProvisionerRecord, ProvisionerType};

const SELECT_PROVISIONER: &str =
    "SELECT id, name, type, details, policy, require_eab, created_at FROM provisioners";

#[derive(Debug, Clone)]
pub struct SqliteAdminStore {
    pool: SqlitePool,
}

impl SqliteAdminStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_provisioner(&self, record: &ProvisionerRecord) -> StoreResult<()> {
        let details = serde_json::to_string(&record.details).map_err(anyhow::Error::from)?;
        let policy = record
            .policy
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(anyhow::Error::from)?;

        sqlx::query(
            "INSERT INTO provisioners (id, name, type, details, policy, require_eab, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.kind.as_str())
        .bind(details)
        .bind(policy)
        .bind(record.require_eab)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AdminStore for SqliteAdminStore {
    async fn get_provisioner(&self, id: &str) -> StoreResult<ProvisionerRecord> {
        let row = sqlx::query(&format!("{SELECT_PROVISIONER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("provisioner {id}")))?;

        provisioner_from_row(&row)
    }

    async fn list_provisioners(&self) -> StoreResult<Vec<ProvisionerRecord>> {
        let rows = sqlx::query(&format!("{SELECT_PROVISIONER} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(provisioner_from_row).collect()
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Standalone
    }
}

fn provisioner_from_row(row: &SqliteRow) -> StoreResult<ProvisionerRecord> {
    let kind: String = row.try_get("type")?;
    let kind = kind
        .parse::<ProvisionerType>()
        .map_err(|err| anyhow::anyhow!(err))?;

    let details: String = row.try_get("details")?;
    let details = serde_json::from_str(&details)
        .map_err(|err| anyhow::anyhow!("invalid provisioner details: {err}"))?;

    let policy: Option<String> = row.try_get("policy")?;
    let policy = policy
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|err| anyhow::anyhow!("invalid provisioner policy: {err}"))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(ProvisionerRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind,
        details,
        policy,
        require_eab: row.try_get("require_eab")?,
        created_at,
    })
}
