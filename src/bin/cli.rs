use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use uuid::Uuid;

use ca_admin_api::config::token_exp_minutes;
use ca_admin_api::db;
use ca_admin_api::jwt::TokenConfig;
use ca_admin_api::models::{AdminIdentity, AdminScope, ProvisionerRecord, ProvisionerType};
use ca_admin_api::store::{AdminStore, SqliteAdminStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "ca-admin operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations to the admin database
    Migrate,
    /// Register a provisioner in the admin database
    AddProvisioner {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        kind: String,
        /// Provisioner details as a JSON object
        #[arg(long)]
        details: Option<String>,
        /// Issuance policy as a JSON object
        #[arg(long)]
        policy: Option<String>,
        #[arg(long)]
        require_eab: bool,
    },
    /// List provisioners in the admin database
    ListProvisioners,
    /// Sign an admin bearer token with ADMIN_TOKEN_SECRET
    IssueToken {
        #[arg(long)]
        subject: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::Admin)]
        scope: ScopeArg,
        #[arg(long)]
        admin_id: Option<Uuid>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Admin,
    SuperAdmin,
}

impl From<ScopeArg> for AdminScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Admin => AdminScope::Admin,
            ScopeArg::SuperAdmin => AdminScope::SuperAdmin,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD, then fall back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            // `db::init` applies migrations on connect.
            open_store().await?;
            println!("Migrations applied");
        }
        Commands::AddProvisioner {
            name,
            kind,
            details,
            policy,
            require_eab,
        } => {
            let kind = kind.parse::<ProvisionerType>().map_err(anyhow::Error::msg)?;
            let mut record = ProvisionerRecord::new(Uuid::new_v4().to_string(), name, kind)
                .with_require_eab(require_eab);
            if let Some(raw) = details {
                record = record.with_details(parse_json("details", &raw)?);
            }
            if let Some(raw) = policy {
                record = record.with_policy(parse_json("policy", &raw)?);
            }

            let store = open_store().await?;
            store
                .create_provisioner(&record)
                .await
                .with_context(|| format!("failed to add provisioner {}", record.name))?;
            println!("Added provisioner {} ({})", record.name, record.id);
        }
        Commands::ListProvisioners => {
            let store = open_store().await?;
            for record in store.list_provisioners().await? {
                let eab = if record.require_eab { " eab" } else { "" };
                println!("{}\t{}\t{}{}", record.id, record.kind, record.name, eab);
            }
        }
        Commands::IssueToken {
            subject,
            scope,
            admin_id,
        } => {
            let secret =
                std::env::var("ADMIN_TOKEN_SECRET").context("ADMIN_TOKEN_SECRET not set")?;
            let exp_minutes = token_exp_minutes(std::env::var("ADMIN_TOKEN_EXP_MINUTES").ok())?;

            let admin = AdminIdentity::new(admin_id.unwrap_or_else(Uuid::new_v4), subject, scope.into());
            let token = TokenConfig::new(secret, exp_minutes)
                .encode(&admin)
                .context("failed to sign admin token")?;
            println!("{token}");
        }
    }

    Ok(())
}

async fn open_store() -> anyhow::Result<SqliteAdminStore> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let pool = db::init(&database_url).await?;
    Ok(SqliteAdminStore::new(pool))
}

fn parse_json(field: &str, raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).with_context(|| format!("--{field} must be valid JSON"))
}
